//! Application startup and utilities.
//!
//! This module contains exit codes, tracing setup, and error hints
//! that support the main entry point.

use netdevs::config::ConfigError;
use netdevs::network::DiscoveryError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::run::RunError;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Configuration error (exit code 1) - invalid args, unreadable config file, etc.
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2) - OS query failure, no suitable device, etc.
    ///
    /// Note: This is a function rather than a constant because `ExitCode::from()` is not `const fn`.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Prints helpful hints for common configuration errors.
pub fn print_config_hint(error: &ConfigError) {
    match error {
        ConfigError::FileRead { .. } => {
            eprintln!("\nRun 'netdevs init' to generate a configuration template.");
        }
        ConfigError::InvalidStrategy { .. } | ConfigError::InvalidFormat { .. } => {
            eprintln!("\nSee the comments in 'netdevs init' output for accepted values.");
        }
        _ => {}
    }
}

/// Prints helpful hints for common runtime errors.
pub fn print_run_hint(error: &RunError) {
    if let Some(hint) = run_hint(error) {
        eprintln!("\n{hint}");
    }
}

fn run_hint(error: &RunError) -> Option<&'static str> {
    match error {
        RunError::Discovery(DiscoveryError::NoSuitableDevice) => Some(
            "Capturing usually needs elevated privileges; \
             try 'netdevs --no-probe list' to see every up interface.",
        ),
        RunError::Discovery(DiscoveryError::UnsupportedStrategy { .. }) => {
            Some("Use '--strategy getifaddrs' on this platform.")
        }
        _ => None,
    }
}

/// Sets up the tracing subscriber for logging.
///
/// Logs go to standard error so command output stays machine-readable.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
