//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

use crate::network::ProbeOptions;

/// Default configuration file name for the `init` command.
pub const CONFIG_FILE: &str = "netdevs.toml";

/// Default scan strategy name.
pub const STRATEGY: &str = "auto";

/// Default initial `SIOCGIFCONF` buffer size in bytes.
pub const INITIAL_BUFFER_SIZE: usize = crate::network::platform::DEFAULT_CONF_BUFFER;

/// Whether devices are probed before being listed.
pub const PROBE_ENABLED: bool = true;

/// Default probe frame budget in bytes.
pub const SNAPLEN: u32 = ProbeOptions::DEFAULT_SNAPLEN;

/// Default probe read timeout in milliseconds (0 = block indefinitely).
pub const TIMEOUT_MS: u64 = 0;

/// Default output format name.
pub const FORMAT: &str = "text";

/// Default probe read timeout as Duration.
#[must_use]
pub const fn timeout() -> Duration {
    Duration::from_millis(TIMEOUT_MS)
}
