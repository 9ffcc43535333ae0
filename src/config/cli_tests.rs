//! Tests for CLI argument parsing.

use super::cli::{Cli, Command, FormatArg, StrategyArg};

mod parsing {
    use super::*;

    #[test]
    fn parse_scan_options() {
        let cli = Cli::parse_from_iter(["netdevs", "--strategy", "ioctl", "--buffer-size", "64"]);

        assert_eq!(cli.strategy, Some(StrategyArg::Ioctl));
        assert_eq!(cli.buffer_size, Some(64));
    }

    #[test]
    fn parse_all_strategies() {
        let auto = Cli::parse_from_iter(["netdevs", "--strategy", "auto"]);
        assert_eq!(auto.strategy, Some(StrategyArg::Auto));

        let ifaddrs = Cli::parse_from_iter(["netdevs", "--strategy", "getifaddrs"]);
        assert_eq!(ifaddrs.strategy, Some(StrategyArg::Getifaddrs));

        let ioctl = Cli::parse_from_iter(["netdevs", "--strategy", "ioctl"]);
        assert_eq!(ioctl.strategy, Some(StrategyArg::Ioctl));
    }

    #[test]
    fn parse_probe_options() {
        let cli = Cli::parse_from_iter([
            "netdevs",
            "--no-probe",
            "--snaplen",
            "1500",
            "--promiscuous",
            "--timeout-ms",
            "250",
        ]);

        assert!(cli.no_probe);
        assert_eq!(cli.snaplen, Some(1500));
        assert!(cli.promiscuous);
        assert_eq!(cli.timeout_ms, Some(250));
    }

    #[test]
    fn parse_filter_options() {
        let cli = Cli::parse_from_iter([
            "netdevs",
            "--include",
            "^eth",
            "--include",
            "^wlan",
            "--exclude",
            "^docker",
            "--exclude-loopback",
        ]);

        assert_eq!(cli.include, vec!["^eth", "^wlan"]);
        assert_eq!(cli.exclude, vec!["^docker"]);
        assert!(cli.exclude_loopback);
    }

    #[test]
    fn parse_format_options() {
        let text = Cli::parse_from_iter(["netdevs", "--format", "text"]);
        assert_eq!(text.format, Some(FormatArg::Text));

        let json = Cli::parse_from_iter(["netdevs", "--json"]);
        assert!(json.json);
        assert!(json.format.is_none());
    }

    #[test]
    fn json_conflicts_with_format() {
        use clap::Parser;

        let result = Cli::try_parse_from(["netdevs", "--json", "--format", "text"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_misc_options() {
        let cli = Cli::parse_from_iter(["netdevs", "--config", "/path/to/config.toml", "-v"]);

        assert_eq!(
            cli.config.as_ref().unwrap().to_str(),
            Some("/path/to/config.toml")
        );
        assert!(cli.verbose);
    }

    #[test]
    fn default_values() {
        let cli = Cli::parse_from_iter(["netdevs"]);

        // Optional fields have no defaults in CLI - None when not specified
        assert!(cli.strategy.is_none());
        assert!(cli.buffer_size.is_none());
        assert!(cli.snaplen.is_none());
        assert!(cli.timeout_ms.is_none());
        assert!(cli.format.is_none());
        // Boolean flags default to false
        assert!(!cli.no_probe);
        assert!(!cli.promiscuous);
        assert!(!cli.json);
        assert!(!cli.verbose);
        // Vec fields default to empty
        assert!(cli.include.is_empty());
        assert!(cli.exclude.is_empty());
    }

    #[test]
    fn global_options_follow_subcommands() {
        let cli = Cli::parse_from_iter(["netdevs", "list", "--json", "--no-probe"]);

        assert_eq!(cli.command, Some(Command::List));
        assert!(cli.json);
        assert!(cli.no_probe);
    }
}

mod subcommands {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn list_is_the_default_command() {
        let cli = Cli::parse_from_iter(["netdevs"]);

        assert!(cli.command.is_none());
        assert_eq!(cli.command(), Command::List);
    }

    #[test]
    fn parse_default_command() {
        let cli = Cli::parse_from_iter(["netdevs", "default"]);
        assert_eq!(cli.command(), Command::DefaultDevice);
    }

    #[test]
    fn parse_net_without_device() {
        let cli = Cli::parse_from_iter(["netdevs", "net"]);
        assert_eq!(cli.command(), Command::Net { device: None });
    }

    #[test]
    fn parse_net_with_device() {
        let cli = Cli::parse_from_iter(["netdevs", "net", "eth0"]);
        assert_eq!(
            cli.command(),
            Command::Net {
                device: Some("eth0".to_string())
            }
        );
    }

    #[test]
    fn parse_init_with_default_output() {
        let cli = Cli::parse_from_iter(["netdevs", "init"]);

        assert!(cli.is_init());
        match cli.command {
            Some(Command::Init { output }) => {
                assert_eq!(output, PathBuf::from("netdevs.toml"));
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn parse_init_with_custom_output() {
        let cli = Cli::parse_from_iter(["netdevs", "init", "--output", "/custom/path/config.toml"]);

        match cli.command {
            Some(Command::Init { output }) => {
                assert_eq!(output, PathBuf::from("/custom/path/config.toml"));
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn is_init_false_for_other_commands() {
        assert!(!Cli::parse_from_iter(["netdevs"]).is_init());
        assert!(!Cli::parse_from_iter(["netdevs", "net", "lo"]).is_init());
    }
}

mod value_enums {
    use super::*;
    use crate::config::OutputFormat;
    use crate::network::platform::ScanStrategy;
    use clap::ValueEnum;

    #[test]
    fn strategy_arg_converts_to_scan_strategy() {
        assert_eq!(ScanStrategy::from(StrategyArg::Auto), ScanStrategy::Auto);
        assert_eq!(
            ScanStrategy::from(StrategyArg::Getifaddrs),
            ScanStrategy::Getifaddrs
        );
        assert_eq!(ScanStrategy::from(StrategyArg::Ioctl), ScanStrategy::Ioctl);
    }

    #[test]
    fn format_arg_converts_to_output_format() {
        assert_eq!(OutputFormat::from(FormatArg::Text), OutputFormat::Text);
        assert_eq!(OutputFormat::from(FormatArg::Json), OutputFormat::Json);
    }

    #[test]
    fn parse_invalid_strategy_returns_error() {
        assert!(StrategyArg::from_str("netlink", false).is_err());
    }

    #[test]
    fn parse_case_insensitive() {
        let format = FormatArg::from_str("JSON", true).unwrap();
        assert_eq!(format, FormatArg::Json);
    }
}
