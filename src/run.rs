//! Command execution and output rendering.
//!
//! Each subcommand runs one synchronous discovery or lookup against the host
//! and renders the result in the configured format.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use netdevs::config::{Command, ConfigError, OutputFormat, ValidatedConfig, write_default_config};
use netdevs::network::filter::FilterChain;
use netdevs::network::platform::{self, HostOpener, PlatformProfile};
use netdevs::network::{
    AddressRecord, AddressSource, DeviceFinder, DeviceRecord, DeviceRegistry, DiscoveryError,
    LookupError, NetworkMask,
};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for command execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Device discovery failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Network lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Writing the configuration template failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// JSON rendering failed.
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing to standard output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// The finder used against the host.
type HostFinder = DeviceFinder<Box<dyn AddressSource>, HostOpener>;

/// Executes `command`, writing its result to standard output.
///
/// # Errors
///
/// Returns [`RunError`] if discovery, the lookup, or writing the output fails.
#[cfg(not(tarpaulin_include))]
pub fn execute(command: &Command, config: &ValidatedConfig) -> Result<(), RunError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::List => {
            let registry = build_finder(config)?.find_all()?;
            render_list(&mut out, &registry, &config.filter, config.format)?;
            let released = registry.dispose();
            tracing::debug!(
                "Released {} device(s), {} address record(s)",
                released.devices,
                released.addresses
            );
        }
        Command::DefaultDevice => {
            let name = build_finder(config)?.lookup_default()?;
            render_default(&mut out, &name, config.format)?;
        }
        Command::Net { device } => {
            let net = platform::lookup_net(device.as_deref())?;
            render_net(&mut out, device.as_deref(), net, config.format)?;
        }
        Command::Init { output } => write_template(&mut out, output)?,
    }

    out.flush()?;
    Ok(())
}

/// Writes the configuration template to `path` and reports where it went.
fn write_template<W: Write>(out: &mut W, path: &Path) -> Result<(), RunError> {
    write_default_config(path)?;
    writeln!(out, "Configuration template written to: {}", path.display())?;
    Ok(())
}

/// Builds the host finder described by `config`.
fn build_finder(config: &ValidatedConfig) -> Result<HostFinder, DiscoveryError> {
    let profile = PlatformProfile::host();
    let source = platform::select_source(config.strategy, profile, config.initial_buffer_size)?;

    if !config.probe_enabled {
        tracing::info!("Capture probe disabled, listing every up interface");
    }

    Ok(DeviceFinder::new(source, HostOpener::new(config.probe_enabled))
        .with_probe_options(config.probe)
        .with_loopback_detection(profile.loopback))
}

// ============================================================================
// Rendering
// ============================================================================

/// Writes the devices of `registry` that pass `filter`, in registry order.
fn render_list<W: Write>(
    out: &mut W,
    registry: &DeviceRegistry,
    filter: &FilterChain,
    format: OutputFormat,
) -> Result<(), RunError> {
    let devices: Vec<&DeviceRecord> = filter.select(registry).collect();
    tracing::debug!("Showing {} of {} device(s)", devices.len(), registry.len());

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &devices)?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for (index, device) in devices.iter().enumerate() {
                write_device(out, index + 1, device)?;
            }
        }
    }
    Ok(())
}

fn write_device<W: Write>(out: &mut W, position: usize, device: &DeviceRecord) -> io::Result<()> {
    write!(out, "{position}. {}", device.name())?;
    if let Some(description) = device.description() {
        write!(out, " ({description})")?;
    }
    if device.is_loopback() {
        write!(out, " [Loopback]")?;
    }
    writeln!(out)?;

    for address in device.addresses() {
        write_address(out, address)?;
    }
    Ok(())
}

fn write_address<W: Write>(out: &mut W, address: &AddressRecord) -> io::Result<()> {
    let Some(addr) = &address.address else {
        return Ok(());
    };

    write!(out, "    {addr}")?;
    if let Some(netmask) = &address.netmask {
        write!(out, " netmask {netmask}")?;
    }
    if let Some(broadcast) = &address.broadcast {
        write!(out, " broadcast {broadcast}")?;
    }
    if let Some(destination) = &address.destination {
        write!(out, " peer {destination}")?;
    }
    writeln!(out)
}

#[derive(Serialize)]
struct DefaultDevice<'a> {
    device: &'a str,
}

fn render_default<W: Write>(out: &mut W, name: &str, format: OutputFormat) -> Result<(), RunError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &DefaultDevice { device: name })?;
            writeln!(out)?;
        }
        OutputFormat::Text => writeln!(out, "{name}")?,
    }
    Ok(())
}

#[derive(Serialize)]
struct NetReport<'a> {
    device: &'a str,
    #[serde(flatten)]
    net: NetworkMask,
    prefix_len: u32,
}

fn render_net<W: Write>(
    out: &mut W,
    device: Option<&str>,
    net: NetworkMask,
    format: OutputFormat,
) -> Result<(), RunError> {
    let device = device.unwrap_or(netdevs::network::ANY_DEVICE);
    match format {
        OutputFormat::Json => {
            let report = NetReport {
                device,
                net,
                prefix_len: net.prefix_len(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Text => writeln!(out, "{device}: {net} (/{})", net.prefix_len())?,
    }
    Ok(())
}
