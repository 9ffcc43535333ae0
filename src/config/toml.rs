//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Address enumeration configuration
    #[serde(default)]
    pub scan: ScanSection,

    /// Capture probe configuration
    #[serde(default)]
    pub probe: ProbeSection,

    /// Output rendering configuration
    #[serde(default)]
    pub output: OutputSection,

    /// Device name filter configuration
    #[serde(default)]
    pub filter: FilterSection,
}

/// Address enumeration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    /// Enumeration strategy: "auto", "getifaddrs", or "ioctl"
    pub strategy: Option<String>,

    /// Initial `SIOCGIFCONF` buffer size in bytes
    pub initial_buffer_size: Option<usize>,
}

/// Capture probe section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeSection {
    /// Probe devices before listing them
    pub enabled: Option<bool>,

    /// Frame budget of the probe session in bytes
    pub snaplen: Option<u32>,

    /// Request promiscuous mode during the probe
    #[serde(default)]
    pub promiscuous: bool,

    /// Probe read timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Output rendering section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// Output format: "text" or "json"
    pub format: Option<String>,
}

/// Device name filter section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    /// Regex patterns for devices to include
    #[serde(default)]
    pub include: Vec<String>,

    /// Regex patterns for devices to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Hide loopback devices
    #[serde(default)]
    pub exclude_loopback: bool,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# netdevs Configuration File

[scan]
# Address enumeration strategy (default: auto)
# Accepted values: "auto", "getifaddrs", "ioctl" (Linux only)
# strategy = "auto"

# Initial SIOCGIFCONF buffer size in bytes, doubled until the result fits
# Only used by the "ioctl" strategy (default: 8192)
# initial_buffer_size = 8192

[probe]
# Open a capture session on every candidate device and drop the ones
# that cannot be opened (default: true)
# Disable to inspect the enumeration without capture privileges
enabled = true

# Bytes captured per frame during the probe (default: 68)
# snaplen = 68

# Request promiscuous mode during the probe
# promiscuous = false

# Probe read timeout in milliseconds (default: 0 = block indefinitely)
# timeout_ms = 0

[output]
# Output format for the device list: "text" or "json" (default: text)
# format = "text"

[filter]
# Regex patterns for devices to show (empty = all)
# Note: CLI patterns REPLACE these entirely (not merged)
# include = ["^eth", "^wlan"]

# Regex patterns for devices to hide
# Note: CLI patterns REPLACE these entirely (not merged)
# exclude = ["^docker", "^veth"]

# Hide loopback devices
# exclude_loopback = false
"#
    .to_string()
}
