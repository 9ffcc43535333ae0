//! Tests for validated configuration.

use std::time::Duration;

use crate::network::DeviceRecord;
use crate::network::filter::DeviceFilter;
use crate::network::platform::ScanStrategy;

use super::ConfigError;
use super::cli::Cli;
use super::toml::TomlConfig;
use super::validated::{OutputFormat, ValidatedConfig, write_default_config};

/// Helper to create CLI args from a slice
fn cli(args: &[&str]) -> Cli {
    let mut full_args = vec!["netdevs"];
    full_args.extend(args);
    Cli::parse_from_iter(full_args)
}

/// Helper to parse TOML config
fn toml(content: &str) -> TomlConfig {
    TomlConfig::parse(content).unwrap()
}

fn device(name: &str) -> DeviceRecord {
    DeviceRecord::new(name, false).unwrap()
}

fn loopback(name: &str) -> DeviceRecord {
    DeviceRecord::new(name, true).unwrap()
}

// ============================================================================
// Defaults
// ============================================================================

mod defaults {
    use super::*;

    #[test]
    fn empty_input_uses_builtin_defaults() {
        let config = ValidatedConfig::from_raw(&cli(&[]), None).unwrap();

        assert_eq!(config.strategy, ScanStrategy::Auto);
        assert_eq!(config.initial_buffer_size, 8192);
        assert!(config.probe_enabled);
        assert_eq!(config.probe.snaplen, 68);
        assert!(!config.probe.promiscuous);
        assert_eq!(config.probe.timeout, Duration::ZERO);
        assert_eq!(config.format, OutputFormat::Text);
        assert!(config.filter.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn empty_toml_uses_builtin_defaults() {
        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml(""))).unwrap();

        assert_eq!(config.strategy, ScanStrategy::Auto);
        assert!(config.probe_enabled);
        assert_eq!(config.format, OutputFormat::Text);
    }
}

// ============================================================================
// Precedence
// ============================================================================

mod precedence {
    use super::*;

    #[test]
    fn toml_values_are_used_without_cli() {
        let toml = toml(
            r#"
            [scan]
            strategy = "ioctl"
            initial_buffer_size = 1024

            [probe]
            snaplen = 96
            timeout_ms = 500

            [output]
            format = "json"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert_eq!(config.strategy, ScanStrategy::Ioctl);
        assert_eq!(config.initial_buffer_size, 1024);
        assert_eq!(config.probe.snaplen, 96);
        assert_eq!(config.probe.timeout, Duration::from_millis(500));
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn cli_overrides_toml() {
        let cli = cli(&[
            "--strategy",
            "getifaddrs",
            "--buffer-size",
            "64",
            "--snaplen",
            "1500",
            "--timeout-ms",
            "10",
            "--format",
            "text",
        ]);
        let toml = toml(
            r#"
            [scan]
            strategy = "ioctl"
            initial_buffer_size = 1024

            [probe]
            snaplen = 96
            timeout_ms = 500

            [output]
            format = "json"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli, Some(&toml)).unwrap();

        assert_eq!(config.strategy, ScanStrategy::Getifaddrs);
        assert_eq!(config.initial_buffer_size, 64);
        assert_eq!(config.probe.snaplen, 1500);
        assert_eq!(config.probe.timeout, Duration::from_millis(10));
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn json_shorthand_overrides_toml_format() {
        let toml = toml(
            r#"
            [output]
            format = "text"
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&["--json"]), Some(&toml)).unwrap();

        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn no_probe_overrides_toml() {
        let toml = toml("[probe]\nenabled = true");

        let config = ValidatedConfig::from_raw(&cli(&["--no-probe"]), Some(&toml)).unwrap();

        assert!(!config.probe_enabled);
    }

    #[test]
    fn toml_can_disable_probe() {
        let toml = toml("[probe]\nenabled = false");

        let config = ValidatedConfig::from_raw(&cli(&[]), Some(&toml)).unwrap();

        assert!(!config.probe_enabled);
    }

    #[test]
    fn promiscuous_uses_or_semantics() {
        let from_toml = ValidatedConfig::from_raw(
            &cli(&[]),
            Some(&toml("[probe]\npromiscuous = true")),
        )
        .unwrap();
        assert!(from_toml.probe.promiscuous);

        let from_cli = ValidatedConfig::from_raw(
            &cli(&["--promiscuous"]),
            Some(&toml("[probe]\npromiscuous = false")),
        )
        .unwrap();
        assert!(from_cli.probe.promiscuous);
    }

    #[test]
    fn verbose_comes_from_cli() {
        let config = ValidatedConfig::from_raw(&cli(&["-v"]), None).unwrap();
        assert!(config.verbose);
    }
}

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn zero_buffer_size_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--buffer-size", "0"]), None);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "initial_buffer_size",
                ..
            })
        ));
    }

    #[test]
    fn zero_snaplen_in_toml_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&[]), Some(&toml("[probe]\nsnaplen = 0")));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "snaplen",
                ..
            })
        ));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = ValidatedConfig::from_raw(
            &cli(&[]),
            Some(&toml("[scan]\nstrategy = \"netlink\"")),
        );

        match result {
            Err(ConfigError::InvalidStrategy { value }) => assert_eq!(value, "netlink"),
            other => panic!("Expected InvalidStrategy, got {other:?}"),
        }
    }

    #[test]
    fn strategy_names_are_case_insensitive() {
        let config = ValidatedConfig::from_raw(
            &cli(&[]),
            Some(&toml("[scan]\nstrategy = \"IOCTL\"")),
        )
        .unwrap();

        assert_eq!(config.strategy, ScanStrategy::Ioctl);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result =
            ValidatedConfig::from_raw(&cli(&[]), Some(&toml("[output]\nformat = \"yaml\"")));

        assert!(matches!(result, Err(ConfigError::InvalidFormat { .. })));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let result = ValidatedConfig::from_raw(&cli(&["--include", "[eth"]), None);

        match result {
            Err(ConfigError::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "[eth"),
            other => panic!("Expected InvalidRegex, got {other:?}"),
        }
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = ConfigError::must_be_positive("snaplen");
        assert_eq!(err.to_string(), "Invalid value for snaplen: must be greater than 0");
    }
}

// ============================================================================
// Filters
// ============================================================================

mod filters {
    use super::*;

    #[test]
    fn cli_includes_replace_toml_includes() {
        let toml = toml(
            r#"
            [filter]
            include = ["^eth"]
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&["--include", "^wlan"]), Some(&toml)).unwrap();

        assert_eq!(config.filter.include_count(), 1);
        assert!(config.filter.matches(&device("wlan0")));
        assert!(!config.filter.matches(&device("eth0")));
    }

    #[test]
    fn toml_excludes_survive_cli_includes() {
        let toml = toml(
            r#"
            [filter]
            include = ["^eth"]
            exclude = ["^eth9"]
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&["--include", "^eth"]), Some(&toml)).unwrap();

        assert_eq!(config.filter.exclude_count(), 1);
        assert!(config.filter.matches(&device("eth0")));
        assert!(!config.filter.matches(&device("eth9")));
    }

    #[test]
    fn cli_excludes_replace_toml_excludes() {
        let toml = toml(
            r#"
            [filter]
            exclude = ["^docker"]
        "#,
        );

        let config = ValidatedConfig::from_raw(&cli(&["--exclude", "^veth"]), Some(&toml)).unwrap();

        assert!(config.filter.matches(&device("docker0")));
        assert!(!config.filter.matches(&device("veth1")));
    }

    #[test]
    fn exclude_loopback_from_either_source() {
        let from_cli = ValidatedConfig::from_raw(&cli(&["--exclude-loopback"]), None).unwrap();
        assert!(!from_cli.filter.matches(&loopback("lo")));

        let from_toml = ValidatedConfig::from_raw(
            &cli(&[]),
            Some(&toml("[filter]\nexclude_loopback = true")),
        )
        .unwrap();
        assert!(!from_toml.filter.matches(&loopback("lo")));
        assert!(from_toml.filter.matches(&device("eth0")));
    }

    #[test]
    fn loopback_is_kept_by_default() {
        let config = ValidatedConfig::from_raw(&cli(&[]), None).unwrap();
        assert!(config.filter.matches(&loopback("lo")));
    }
}

// ============================================================================
// Loading and Display
// ============================================================================

mod loading {
    use super::*;

    #[test]
    fn load_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netdevs.toml");
        std::fs::write(&path, "[output]\nformat = \"json\"\n").unwrap();

        let cli = cli(&["--config", path.to_str().unwrap()]);
        let config = ValidatedConfig::load(&cli).unwrap();

        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn load_without_config_uses_defaults() {
        let config = ValidatedConfig::load(&cli(&[])).unwrap();
        assert_eq!(config.strategy, ScanStrategy::Auto);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()]));

        assert!(matches!(result, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn written_template_loads_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("netdevs.toml");

        write_default_config(&path).unwrap();
        let config = ValidatedConfig::load(&cli(&["--config", path.to_str().unwrap()])).unwrap();

        assert!(config.probe_enabled);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/netdevs.toml");

        assert!(matches!(
            write_default_config(&path),
            Err(ConfigError::FileWrite { .. })
        ));
    }

    #[test]
    fn display_summarizes_settings() {
        let config = ValidatedConfig::from_raw(
            &cli(&["--no-probe", "--exclude", "^docker", "--timeout-ms", "250"]),
            None,
        )
        .unwrap();

        let text = config.to_string();

        assert!(text.contains("strategy: auto"), "{text}");
        assert!(text.contains("probe: off"), "{text}");
        assert!(text.contains("timeout: 250ms"), "{text}");
        assert!(text.contains("filters: 0+1"), "{text}");
    }
}
