//! Full discovery passes and the default-device query.

use super::device::LoopbackDetection;
use super::probe::{CaptureOpener, ProbeOptions};
use super::registry::{DeviceRegistry, RegistryBuilder};
use super::{AddressSource, DiscoveryError};

/// Runs discovery passes over an [`AddressSource`], probing with a
/// [`CaptureOpener`].
///
/// Every call builds a fresh snapshot; nothing is cached between calls.
///
/// # Example
///
/// ```no_run
/// use netdevs::network::{DeviceFinder, platform};
///
/// let finder = DeviceFinder::new(platform::default_source(), platform::HostOpener::packet());
/// for device in &finder.find_all().expect("discovery failed") {
///     println!("{}", device.name());
/// }
/// ```
#[derive(Debug)]
pub struct DeviceFinder<S, O> {
    source: S,
    opener: O,
    options: ProbeOptions,
    loopback: LoopbackDetection,
}

impl<S: AddressSource, O: CaptureOpener> DeviceFinder<S, O> {
    /// Creates a finder with default probe options and flag-based loopback
    /// detection.
    #[must_use]
    pub fn new(source: S, opener: O) -> Self {
        Self {
            source,
            opener,
            options: ProbeOptions::default(),
            loopback: LoopbackDetection::default(),
        }
    }

    /// Overrides the probe session parameters.
    #[must_use]
    pub const fn with_probe_options(mut self, options: ProbeOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides how loopback devices are recognized.
    #[must_use]
    pub const fn with_loopback_detection(mut self, loopback: LoopbackDetection) -> Self {
        self.loopback = loopback;
        self
    }

    /// Returns the address source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Builds the registry of every up, openable device plus the catch-all
    /// device.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] on a fatal OS query or allocation failure.
    /// The partially built registry has already been released by then.
    pub fn find_all(&self) -> Result<DeviceRegistry, DiscoveryError> {
        let mut builder = RegistryBuilder::new(&self.opener, self.options, self.loopback);

        if let Err(e) = self.source.scan(&mut builder) {
            builder.discard();
            return Err(e);
        }
        if let Err(e) = builder.add_any_device() {
            builder.discard();
            return Err(e);
        }

        let registry = builder.finish();
        tracing::debug!(
            "Discovered {} device(s) via {}",
            registry.len(),
            self.source.label()
        );
        Ok(registry)
    }

    /// Returns the name of the preferred capture device.
    ///
    /// That is the first device of a fresh registry, provided it is not a
    /// loopback device. Registry ordering puts every non-loopback device
    /// before every loopback one, so a loopback first entry means there is
    /// no non-loopback device at all; that case fails rather than falling
    /// back to loopback.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NoSuitableDevice`] if the registry is empty
    /// or starts with a loopback device, or any error from [`Self::find_all`].
    pub fn lookup_default(&self) -> Result<String, DiscoveryError> {
        let registry = self.find_all()?;

        let result = match registry.first() {
            Some(device) if !device.is_loopback() => copy_name(device.name()),
            _ => Err(DiscoveryError::NoSuitableDevice),
        };

        registry.dispose();
        result
    }
}

fn copy_name(name: &str) -> Result<String, DiscoveryError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(name.len())
        .map_err(|_| DiscoveryError::allocation("device name"))?;
    owned.push_str(name);
    Ok(owned)
}
