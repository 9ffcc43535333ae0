//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::network::platform::ScanStrategy;

use super::OutputFormat;

/// netdevs: capture device discovery
///
/// Lists the network devices a packet capture could be opened on,
/// picks the default one, and resolves IPv4 network/mask pairs.
#[derive(Debug, Parser)]
#[command(name = "netdevs")]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are naturally boolean
pub struct Cli {
    /// Subcommand to run (default: list)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address enumeration strategy
    #[arg(long, value_enum, global = true)]
    pub strategy: Option<StrategyArg>,

    /// Initial SIOCGIFCONF buffer size in bytes
    #[arg(long = "buffer-size", global = true)]
    pub buffer_size: Option<usize>,

    /// Skip the capture probe and list every up interface
    #[arg(long = "no-probe", global = true)]
    pub no_probe: bool,

    /// Bytes captured per frame during the probe
    #[arg(long, global = true)]
    pub snaplen: Option<u32>,

    /// Request promiscuous mode during the probe
    #[arg(long, global = true)]
    pub promiscuous: bool,

    /// Probe read timeout in milliseconds
    #[arg(long = "timeout-ms", global = true)]
    pub timeout_ms: Option<u64>,

    /// Output format
    #[arg(long, value_enum, global = true)]
    pub format: Option<FormatArg>,

    /// Shorthand for --format json
    #[arg(long, global = true, conflicts_with = "format")]
    pub json: bool,

    /// Regex pattern for devices to include (can be specified multiple times)
    #[arg(long = "include", value_name = "PATTERN", global = true)]
    pub include: Vec<String>,

    /// Regex pattern for devices to exclude (can be specified multiple times)
    #[arg(long = "exclude", value_name = "PATTERN", global = true)]
    pub exclude: Vec<String>,

    /// Hide loopback devices
    #[arg(long = "exclude-loopback", global = true)]
    pub exclude_loopback: bool,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for netdevs
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List every capture-worthy device with its addresses
    List,

    /// Print the name of the default capture device
    #[command(name = "default")]
    DefaultDevice,

    /// Print the IPv4 network and mask of a device
    Net {
        /// Device name (omitted or "any" = every interface)
        device: Option<String>,
    },

    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = super::defaults::CONFIG_FILE)]
        output: PathBuf,
    },
}

/// Scan strategy argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Preferred strategy for the host
    Auto,
    /// One getifaddrs call
    Getifaddrs,
    /// SIOCGIFCONF followed by per-interface queries
    Ioctl,
}

impl From<StrategyArg> for ScanStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::Getifaddrs => Self::Getifaddrs,
            StrategyArg::Ioctl => Self::Ioctl,
        }
    }
}

/// Output format argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Human-readable listing
    Text,
    /// Pretty-printed JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }

    /// Returns the subcommand to run, defaulting to `list`.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::List)
    }
}
