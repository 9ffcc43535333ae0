//! The ordered device registry and the builder that fills it.
//!
//! # Ordering
//!
//! After every insertion the registry satisfies:
//!
//! 1. device names are unique;
//! 2. every non-loopback device precedes every loopback device;
//! 3. within each of those partitions, instance numbers never decrease.
//!
//! Ties keep discovery order, so `eth0` seen before `wlan0` stays first.

use serde::Serialize;

use super::device::{ANY_DEVICE, AddressRecord, DeviceRecord, InterfaceFlags, LoopbackDetection};
use super::probe::{CaptureOpener, ProbeOptions};
use super::{AddressSink, DiscoveryError, InterfaceEntry};

/// Counts of what a disposal released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    /// Device records released.
    pub devices: usize,
    /// Address records released.
    pub addresses: usize,
    /// Socket address copies released.
    pub socket_addresses: usize,
}

/// An ordered, deduplicated snapshot of capture-worthy devices.
///
/// The registry owns every device record, which owns its address records,
/// which own their socket address copies. Dropping the registry releases
/// all of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceRegistry {
    devices: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The first device in registry order.
    #[must_use]
    pub fn first(&self) -> Option<&DeviceRecord> {
        self.devices.first()
    }

    /// Looks a device up by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.name() == name)
    }

    /// Iterates over devices in registry order.
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceRecord> {
        self.devices.iter()
    }

    /// Device names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(DeviceRecord::name)
    }

    /// Releases every device, address record and address copy.
    ///
    /// Ownership makes a second disposal of the same registry impossible.
    pub fn dispose(self) -> Released {
        let mut released = Released::default();
        for device in self.devices {
            let (addresses, copies) = device.release();
            released.devices += 1;
            released.addresses += addresses;
            released.socket_addresses += copies;
        }
        released
    }

    /// Disposes `registry` if present; an absent registry releases nothing.
    pub fn dispose_all(registry: Option<Self>) -> Released {
        registry.map(Self::dispose).unwrap_or_default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.name() == name)
    }

    /// Inserts a record at its ordered position and returns it.
    fn insert(&mut self, record: DeviceRecord) -> Result<&mut DeviceRecord, DiscoveryError> {
        self.devices
            .try_reserve(1)
            .map_err(|_| DiscoveryError::allocation("device record"))?;
        let at = self.insertion_point(&record);
        self.devices.insert(at, record);
        Ok(&mut self.devices[at])
    }

    /// Index of the first device the new record must precede.
    fn insertion_point(&self, new: &DeviceRecord) -> usize {
        self.devices
            .iter()
            .position(|next| goes_before(new, next))
            .unwrap_or(self.devices.len())
    }
}

fn goes_before(new: &DeviceRecord, next: &DeviceRecord) -> bool {
    if !new.is_loopback() && next.is_loopback() {
        return true;
    }
    new.instance() < next.instance() && (!new.is_loopback() || next.is_loopback())
}

impl<'a> IntoIterator for &'a DeviceRegistry {
    type Item = &'a DeviceRecord;
    type IntoIter = std::slice::Iter<'a, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

impl IntoIterator for DeviceRegistry {
    type Item = DeviceRecord;
    type IntoIter = std::vec::IntoIter<DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}

/// Builds a [`DeviceRegistry`], admitting only devices that pass the probe.
///
/// Implements [`AddressSink`], so an [`AddressSource`](super::AddressSource)
/// can feed it directly.
pub struct RegistryBuilder<'a, O: CaptureOpener + ?Sized> {
    opener: &'a O,
    options: ProbeOptions,
    loopback: LoopbackDetection,
    registry: DeviceRegistry,
}

impl<'a, O: CaptureOpener + ?Sized> RegistryBuilder<'a, O> {
    /// Creates a builder around an empty registry.
    #[must_use]
    pub const fn new(opener: &'a O, options: ProbeOptions, loopback: LoopbackDetection) -> Self {
        Self {
            opener,
            options,
            loopback,
            registry: DeviceRegistry::new(),
        }
    }

    /// Returns the device named `name`, creating it if needed.
    ///
    /// The device is probed first, even if it is already registered. A
    /// failed probe returns `Ok(None)`: the device is silently left out.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if a new record cannot be
    /// allocated.
    pub fn find_or_create(
        &mut self,
        name: &str,
        flags: InterfaceFlags,
    ) -> Result<Option<&mut DeviceRecord>, DiscoveryError> {
        if let Err(e) = self.opener.probe(name, &self.options) {
            tracing::debug!("Omitting {name}: {e}");
            return Ok(None);
        }

        if let Some(at) = self.registry.position(name) {
            return Ok(Some(&mut self.registry.devices[at]));
        }

        let is_loopback = self.loopback.is_loopback(name, flags);
        let record = DeviceRecord::new(name, is_loopback)?;
        tracing::debug!(
            "Registering {name} (instance {}, loopback: {is_loopback})",
            record.instance()
        );
        self.registry.insert(record).map(Some)
    }

    /// Attaches one address tuple to its device.
    ///
    /// Devices that fail the probe are skipped without error.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if the device, the address
    /// record or any address copy cannot be allocated.
    pub fn attach_entry(&mut self, entry: &InterfaceEntry<'_>) -> Result<(), DiscoveryError> {
        let Some(device) = self.find_or_create(entry.name, entry.flags)? else {
            return Ok(());
        };
        let record = AddressRecord::copy_from(entry)?;
        tracing::trace!(
            "Attaching address #{} to {}",
            device.addresses().len() + 1,
            entry.name
        );
        device.push_address(record)
    }

    /// Registers the catch-all [`ANY_DEVICE`] through the normal probe path.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if the record cannot be
    /// allocated.
    pub fn add_any_device(&mut self) -> Result<(), DiscoveryError> {
        self.find_or_create(ANY_DEVICE, InterfaceFlags::empty())
            .map(|_| ())
    }

    /// Read access to the registry built so far.
    #[must_use]
    pub const fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Finishes building and hands the registry over.
    #[must_use]
    pub fn finish(self) -> DeviceRegistry {
        self.registry
    }

    /// Disposes the partially built registry after a fatal error.
    pub fn discard(self) -> Released {
        let released = self.registry.dispose();
        tracing::debug!(
            "Discarded partial registry ({} devices, {} addresses)",
            released.devices,
            released.addresses
        );
        released
    }
}

impl<O: CaptureOpener + ?Sized> AddressSink for RegistryBuilder<'_, O> {
    fn attach(&mut self, entry: &InterfaceEntry<'_>) -> Result<(), DiscoveryError> {
        self.attach_entry(entry)
    }
}

impl<O: CaptureOpener + ?Sized> std::fmt::Debug for RegistryBuilder<'_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("options", &self.options)
            .field("loopback", &self.loopback)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
