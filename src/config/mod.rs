//! Configuration layer for netdevs.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! For filter patterns (`include`, `exclude`), CLI patterns **replace** TOML
//! patterns entirely (not merged). Include and exclude are handled
//! independently: `--include` only replaces TOML includes, TOML excludes are
//! still used unless `--exclude` is given too.
//!
//! # Boolean Flag Semantics
//!
//! `--promiscuous` and `--exclude-loopback` use OR semantics: if set `true`
//! in either CLI or TOML, the result is `true`.
//!
//! `--no-probe` always disables probing; without it `probe.enabled` from
//! TOML decides.
//!
//! Filters only narrow the rendered list. Discovery, default-device
//! selection and network lookups ignore them.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod cli_tests;
#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command, FormatArg, StrategyArg};
pub use error::ConfigError;
pub use toml::{TomlConfig, default_config_template};
pub use validated::{OutputFormat, ValidatedConfig, write_default_config};
