//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::network::ProbeOptions;
use crate::network::filter::{FilterChain, LoopbackFilter, NameRegexFilter};
use crate::network::platform::ScanStrategy;

use super::cli::Cli;
use super::defaults;
use super::error::ConfigError;
use super::toml::TomlConfig;

/// How the device list is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One block per device, one line per address.
    #[default]
    Text,
    /// Pretty-printed JSON array of devices.
    Json,
}

impl OutputFormat {
    /// Returns the configuration name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Address enumeration strategy
    pub strategy: ScanStrategy,

    /// Initial `SIOCGIFCONF` buffer size in bytes
    pub initial_buffer_size: usize,

    /// Whether candidates are probed with a real capture session
    pub probe_enabled: bool,

    /// Probe session parameters
    pub probe: ProbeOptions,

    /// Output format of the device list
    pub format: OutputFormat,

    /// Device filter applied to the rendered list
    pub filter: FilterChain,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ strategy: {}, buffer: {}B, probe: {}, snaplen: {}, promiscuous: {}, \
             timeout: {}ms, format: {}, filters: {}+{} }}",
            self.strategy,
            self.initial_buffer_size,
            if self.probe_enabled { "on" } else { "off" },
            self.probe.snaplen,
            self.probe.promiscuous,
            self.probe.timeout.as_millis(),
            self.format,
            self.filter.include_count(),
            self.filter.exclude_count(),
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The strategy or format name is unknown
    /// - The buffer size or snaplen is zero
    /// - Regex patterns are invalid
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let strategy = Self::resolve_strategy(cli, toml)?;
        let initial_buffer_size = Self::resolve_buffer_size(cli, toml)?;

        // `--no-probe` wins; otherwise TOML, then default
        let probe_enabled = !cli.no_probe
            && toml
                .and_then(|t| t.probe.enabled)
                .unwrap_or(defaults::PROBE_ENABLED);

        let probe = Self::build_probe_options(cli, toml)?;
        let format = Self::resolve_format(cli, toml)?;
        let filter = Self::build_filter(cli, toml)?;

        Ok(Self {
            strategy,
            initial_buffer_size,
            probe_enabled,
            probe,
            format,
            filter,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    fn resolve_strategy(cli: &Cli, toml: Option<&TomlConfig>) -> Result<ScanStrategy, ConfigError> {
        if let Some(strategy) = cli.strategy {
            return Ok(strategy.into());
        }

        let name = toml
            .and_then(|t| t.scan.strategy.as_deref())
            .unwrap_or(defaults::STRATEGY);
        parse_strategy(name)
    }

    fn resolve_buffer_size(cli: &Cli, toml: Option<&TomlConfig>) -> Result<usize, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let size = cli
            .buffer_size
            .or_else(|| toml.and_then(|t| t.scan.initial_buffer_size))
            .unwrap_or(defaults::INITIAL_BUFFER_SIZE);

        if size == 0 {
            return Err(ConfigError::must_be_positive("initial_buffer_size"));
        }

        Ok(size)
    }

    fn build_probe_options(
        cli: &Cli,
        toml: Option<&TomlConfig>,
    ) -> Result<ProbeOptions, ConfigError> {
        let probe = toml.map(|t| &t.probe);

        let snaplen = cli
            .snaplen
            .or_else(|| probe.and_then(|p| p.snaplen))
            .unwrap_or(defaults::SNAPLEN);

        if snaplen == 0 {
            return Err(ConfigError::must_be_positive("snaplen"));
        }

        let timeout = cli
            .timeout_ms
            .or_else(|| probe.and_then(|p| p.timeout_ms))
            .map_or_else(defaults::timeout, Duration::from_millis);

        Ok(ProbeOptions {
            snaplen,
            promiscuous: cli.promiscuous || probe.is_some_and(|p| p.promiscuous),
            timeout,
        })
    }

    fn resolve_format(cli: &Cli, toml: Option<&TomlConfig>) -> Result<OutputFormat, ConfigError> {
        if cli.json {
            return Ok(OutputFormat::Json);
        }
        if let Some(format) = cli.format {
            return Ok(format.into());
        }

        let name = toml
            .and_then(|t| t.output.format.as_deref())
            .unwrap_or(defaults::FORMAT);
        parse_format(name)
    }

    fn build_filter(cli: &Cli, toml: Option<&TomlConfig>) -> Result<FilterChain, ConfigError> {
        let mut filter = FilterChain::new();

        let exclude_loopback =
            cli.exclude_loopback || toml.is_some_and(|t| t.filter.exclude_loopback);
        if exclude_loopback {
            filter = filter.exclude(LoopbackFilter);
        }

        // CLI patterns replace TOML patterns; include and exclude independently
        let includes = if cli.include.is_empty() {
            toml.map_or(&[][..], |t| t.filter.include.as_slice())
        } else {
            cli.include.as_slice()
        };
        for pattern in includes {
            filter = filter.include(compile(pattern)?);
        }

        let excludes = if cli.exclude.is_empty() {
            toml.map_or(&[][..], |t| t.filter.exclude.as_slice())
        } else {
            cli.exclude.as_slice()
        };
        for pattern in excludes {
            filter = filter.exclude(compile(pattern)?);
        }

        Ok(filter)
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn parse_strategy(s: &str) -> Result<ScanStrategy, ConfigError> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(ScanStrategy::Auto),
        "getifaddrs" => Ok(ScanStrategy::Getifaddrs),
        "ioctl" | "siocgifconf" => Ok(ScanStrategy::Ioctl),
        _ => Err(ConfigError::InvalidStrategy {
            value: s.to_string(),
        }),
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, ConfigError> {
    match s.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(ConfigError::InvalidFormat {
            value: s.to_string(),
        }),
    }
}

fn compile(pattern: &str) -> Result<NameRegexFilter, ConfigError> {
    NameRegexFilter::new(pattern).map_err(|e| ConfigError::InvalidRegex {
        pattern: pattern.to_string(),
        source: e,
    })
}
