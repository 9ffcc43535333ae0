//! Core device types: interface flags, device records and address records.

use std::fmt;
use std::ops::BitOr;

use nix::net::if_::InterfaceFlags as IffFlags;
use serde::Serialize;

use super::sockaddr::{SockAddr, SockaddrRef};
use super::{DiscoveryError, InterfaceEntry};

/// Name of the synthetic device that captures on every interface.
pub const ANY_DEVICE: &str = "any";

/// Interface flag bits as reported by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceFlags(IffFlags);

impl InterfaceFlags {
    /// Interface is administratively up.
    pub const UP: Self = Self(IffFlags::IFF_UP);
    /// Interface has a valid broadcast address.
    pub const BROADCAST: Self = Self(IffFlags::IFF_BROADCAST);
    /// Interface is a loopback interface.
    pub const LOOPBACK: Self = Self(IffFlags::IFF_LOOPBACK);
    /// Interface is a point-to-point link.
    pub const POINTOPOINT: Self = Self(IffFlags::IFF_POINTOPOINT);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(IffFlags::empty())
    }

    /// Wraps raw flag bits, keeping bits this crate has no name for.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn from_bits(bits: u32) -> Self {
        Self(IffFlags::from_bits_retain(bits as _))
    }

    /// Returns the raw flag bits.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn bits(self) -> u32 {
        self.0.bits() as u32
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0.contains(other.0)
    }

    #[must_use]
    pub const fn is_up(self) -> bool {
        self.contains(Self::UP)
    }

    #[must_use]
    pub const fn is_loopback(self) -> bool {
        self.contains(Self::LOOPBACK)
    }

    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        self.contains(Self::BROADCAST)
    }

    #[must_use]
    pub const fn is_point_to_point(self) -> bool {
        self.contains(Self::POINTOPOINT)
    }
}

impl Default for InterfaceFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<IffFlags> for InterfaceFlags {
    fn from(flags: IffFlags) -> Self {
        Self(flags)
    }
}

impl BitOr for InterfaceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for InterfaceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.bits())
    }
}

/// How a device is classified as loopback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopbackDetection {
    /// Trust the `IFF_LOOPBACK` flag bit.
    #[default]
    FlagBit,
    /// Match names of the form `lo`, `lo0`, `lo1`, ...
    NamePattern,
}

impl LoopbackDetection {
    /// Classifies a device from its name and flags.
    #[must_use]
    pub fn is_loopback(self, name: &str, flags: InterfaceFlags) -> bool {
        match self {
            Self::FlagBit => flags.is_loopback(),
            Self::NamePattern => looks_like_loopback(name),
        }
    }
}

/// Returns true for `lo` optionally followed by a digit (`lo`, `lo0`, `lo12`).
#[must_use]
pub fn looks_like_loopback(name: &str) -> bool {
    name.strip_prefix("lo")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Returns the number formed by the first run of digits in `name`, or 0.
///
/// Only used to order devices: `eth0` sorts before `eth1` before `wlan2`.
#[must_use]
pub fn instance_number(name: &str) -> u32 {
    name.bytes()
        .skip_while(|b| !b.is_ascii_digit())
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |n, digit| {
            n.saturating_mul(10).saturating_add(u32::from(digit - b'0'))
        })
}

/// One discovered address tuple of a device.
///
/// Each of the four addresses is independently optional; an absent value
/// means the operating system did not report one for this tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddressRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<SockAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub netmask: Option<SockAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast: Option<SockAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<SockAddr>,
}

impl AddressRecord {
    /// Copies every address present in `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if any copy cannot be
    /// allocated; copies made so far are released.
    pub fn copy_from(entry: &InterfaceEntry<'_>) -> Result<Self, DiscoveryError> {
        Ok(Self {
            address: copy_optional(entry.address)?,
            netmask: copy_optional(entry.netmask)?,
            broadcast: copy_optional(entry.broadcast)?,
            destination: copy_optional(entry.destination)?,
        })
    }

    /// Returns how many of the four addresses are present.
    #[must_use]
    pub fn present_count(&self) -> usize {
        [
            &self.address,
            &self.netmask,
            &self.broadcast,
            &self.destination,
        ]
        .iter()
        .filter(|a| a.is_some())
        .count()
    }
}

fn copy_optional(raw: Option<SockaddrRef<'_>>) -> Result<Option<SockAddr>, DiscoveryError> {
    raw.map(|r| r.to_owned_copy()).transpose()
}

/// A capture-worthy network device and the addresses discovered for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    is_loopback: bool,
    addresses: Vec<AddressRecord>,
    #[serde(skip)]
    instance: u32,
}

impl DeviceRecord {
    /// Creates an address-less record, copying `name` fallibly.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if the name cannot be
    /// copied.
    pub fn new(name: &str, is_loopback: bool) -> Result<Self, DiscoveryError> {
        let mut owned = String::new();
        owned
            .try_reserve_exact(name.len())
            .map_err(|_| DiscoveryError::allocation("device name"))?;
        owned.push_str(name);

        Ok(Self {
            instance: instance_number(&owned),
            name: owned,
            description: None,
            is_loopback,
            addresses: Vec::new(),
        })
    }

    /// Appends an address record after every previously discovered one.
    pub(crate) fn push_address(&mut self, record: AddressRecord) -> Result<(), DiscoveryError> {
        self.addresses
            .try_reserve(1)
            .map_err(|_| DiscoveryError::allocation("address record"))?;
        self.addresses.push(record);
        Ok(())
    }

    /// Consumes the record, returning how many socket address copies it held.
    pub(crate) fn release(self) -> (usize, usize) {
        let addresses = self.addresses.len();
        let copies = self.addresses.iter().map(AddressRecord::present_count).sum();
        (addresses, copies)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description. Discovery never fills this in.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn is_loopback(&self) -> bool {
        self.is_loopback
    }

    /// Addresses in discovery order.
    #[must_use]
    pub fn addresses(&self) -> &[AddressRecord] {
        &self.addresses
    }

    /// The ordering key derived from the device name.
    #[must_use]
    pub const fn instance(&self) -> u32 {
        self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod flags {
        use super::*;

        #[test]
        fn empty_contains_nothing() {
            let flags = InterfaceFlags::empty();
            assert!(!flags.is_up());
            assert!(!flags.is_loopback());
            assert!(!flags.is_broadcast());
            assert!(!flags.is_point_to_point());
        }

        #[test]
        fn union_sets_both_bits() {
            let flags = InterfaceFlags::UP | InterfaceFlags::LOOPBACK;
            assert!(flags.is_up());
            assert!(flags.is_loopback());
            assert!(!flags.is_broadcast());
        }

        #[test]
        fn converts_from_os_flags() {
            let flags = InterfaceFlags::from(IffFlags::IFF_UP | IffFlags::IFF_BROADCAST);
            assert!(flags.is_up());
            assert!(flags.is_broadcast());
            assert!(!flags.is_point_to_point());
        }

        #[test]
        fn from_bits_round_trips_raw_value() {
            let raw = InterfaceFlags::UP.bits() | InterfaceFlags::POINTOPOINT.bits();
            assert!(InterfaceFlags::from_bits(raw).is_point_to_point());
        }
    }

    mod loopback_name {
        use super::*;

        #[test]
        fn bare_lo_matches() {
            assert!(looks_like_loopback("lo"));
        }

        #[test]
        fn lo_with_digits_matches() {
            assert!(looks_like_loopback("lo0"));
            assert!(looks_like_loopback("lo12"));
        }

        #[test]
        fn lo_prefix_with_letters_does_not_match() {
            assert!(!looks_like_loopback("lodev"));
            assert!(!looks_like_loopback("loop"));
        }

        #[test]
        fn other_names_do_not_match() {
            assert!(!looks_like_loopback("eth0"));
            assert!(!looks_like_loopback("l"));
            assert!(!looks_like_loopback(""));
        }

        #[test]
        fn detection_modes_differ() {
            let flags = InterfaceFlags::UP;
            assert!(!LoopbackDetection::FlagBit.is_loopback("lo", flags));
            assert!(LoopbackDetection::NamePattern.is_loopback("lo", flags));
        }
    }

    mod instance {
        use super::*;

        #[test]
        fn first_digit_run_is_used() {
            assert_eq!(instance_number("eth0"), 0);
            assert_eq!(instance_number("eth12"), 12);
            assert_eq!(instance_number("vlan10.20"), 10);
            assert_eq!(instance_number("br-3x4"), 3);
        }

        #[test]
        fn no_digits_is_zero() {
            assert_eq!(instance_number("any"), 0);
            assert_eq!(instance_number(""), 0);
        }

        #[test]
        fn overflow_saturates() {
            assert_eq!(instance_number("eth99999999999999"), u32::MAX);
        }
    }

    mod records {
        use super::*;

        #[test]
        fn new_device_has_no_addresses_or_description() {
            let device = DeviceRecord::new("wlan3", false).unwrap();

            assert_eq!(device.name(), "wlan3");
            assert_eq!(device.instance(), 3);
            assert!(device.description().is_none());
            assert!(device.addresses().is_empty());
        }

        #[test]
        fn push_address_preserves_order() {
            let mut device = DeviceRecord::new("eth0", false).unwrap();
            let first = AddressRecord {
                address: Some(SockAddr::from_ip("10.0.0.1".parse().unwrap())),
                ..AddressRecord::default()
            };
            let second = AddressRecord {
                address: Some(SockAddr::from_ip("10.0.0.2".parse().unwrap())),
                ..AddressRecord::default()
            };

            device.push_address(first.clone()).unwrap();
            device.push_address(second.clone()).unwrap();

            assert_eq!(device.addresses(), &[first, second]);
        }

        #[test]
        fn copy_from_keeps_absent_fields_absent() {
            let address = SockAddr::from_ip("192.0.2.1".parse().unwrap());
            let entry = InterfaceEntry::new("eth0", InterfaceFlags::UP)
                .with_address(Some(address.as_sockaddr_ref()));

            let record = AddressRecord::copy_from(&entry).unwrap();

            assert_eq!(record.address, Some(address));
            assert!(record.netmask.is_none());
            assert!(record.broadcast.is_none());
            assert!(record.destination.is_none());
            assert_eq!(record.present_count(), 1);
        }

        #[test]
        fn serialization_omits_absent_fields_and_instance() {
            let mut device = DeviceRecord::new("eth0", false).unwrap();
            device
                .push_address(AddressRecord {
                    address: Some(SockAddr::from_ip("10.0.0.1".parse().unwrap())),
                    ..AddressRecord::default()
                })
                .unwrap();

            let json = serde_json::to_value(&device).unwrap();

            assert_eq!(
                json,
                serde_json::json!({
                    "name": "eth0",
                    "is_loopback": false,
                    "addresses": [{ "address": "10.0.0.1" }]
                })
            );
        }
    }
}
