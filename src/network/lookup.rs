//! IPv4 network and mask resolution for a named device.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;

use serde::Serialize;
use thiserror::Error;

use super::device::ANY_DEVICE;

/// Error type for network/mask resolution.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The query socket could not be created.
    #[error("socket: {0}")]
    Socket(#[source] io::Error),

    /// The device has no IPv4 address.
    #[error("{device}: no IPv4 address assigned")]
    AddressNotAssigned {
        /// The queried device.
        device: String,
    },

    /// An address or netmask query failed.
    #[error("{operation}: {device}: {source}")]
    OsQuery {
        /// The failing request, e.g. `SIOCGIFADDR`.
        operation: &'static str,
        /// The queried device.
        device: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The mask was zero and the address belongs to no classful network.
    #[error("inet class for {:#x} unknown", u32::from(*.address))]
    UnknownAddressClass {
        /// The address whose class could not be determined.
        address: Ipv4Addr,
    },

    /// IPv4 interface queries are not implemented for this platform.
    #[error("IPv4 interface queries are not supported on this platform")]
    Unsupported,
}

/// An IPv4 network number and its mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkMask {
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl NetworkMask {
    /// The "match everything" pair used for the catch-all device.
    pub const ANY: Self = Self {
        network: Ipv4Addr::UNSPECIFIED,
        mask: Ipv4Addr::UNSPECIFIED,
    };

    /// Number of leading one bits in the mask.
    #[must_use]
    pub const fn prefix_len(&self) -> u32 {
        self.mask.to_bits().leading_ones()
    }
}

impl fmt::Display for NetworkMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mask {}", self.network, self.mask)
    }
}

/// Per-device IPv4 queries against the operating system.
pub trait Ipv4Query {
    /// Returns the IPv4 address assigned to `device`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::AddressNotAssigned`] if the device has no IPv4
    /// address, or [`LookupError::OsQuery`] for any other failure.
    fn address(&self, device: &str) -> Result<Ipv4Addr, LookupError>;

    /// Returns the IPv4 netmask of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::OsQuery`] if the query fails.
    fn netmask(&self, device: &str) -> Result<Ipv4Addr, LookupError>;
}

/// Returns true when `device` stands for "every interface".
#[must_use]
pub fn is_catch_all(device: Option<&str>) -> bool {
    device.is_none_or(|name| name == ANY_DEVICE)
}

/// Resolves the network number and mask of `device`.
///
/// An absent device or the catch-all device resolves to [`NetworkMask::ANY`]
/// without querying. A zero mask is replaced by the classful default for the
/// address.
///
/// # Errors
///
/// Returns the query's [`LookupError`], or
/// [`LookupError::UnknownAddressClass`] if a zero mask cannot be defaulted.
pub fn resolve<Q: Ipv4Query + ?Sized>(
    query: &Q,
    device: Option<&str>,
) -> Result<NetworkMask, LookupError> {
    let Some(name) = device.filter(|_| !is_catch_all(device)) else {
        return Ok(NetworkMask::ANY);
    };

    let address = query.address(name)?;
    let mask = query.netmask(name)?;
    network_for(address, mask)
}

/// Combines an address and mask into a network, defaulting a zero mask.
///
/// # Errors
///
/// Returns [`LookupError::UnknownAddressClass`] if `mask` is zero and the
/// address is not class A, B or C.
pub fn network_for(address: Ipv4Addr, mask: Ipv4Addr) -> Result<NetworkMask, LookupError> {
    let mask = if mask.is_unspecified() {
        classful_mask(address)?
    } else {
        mask
    };
    Ok(NetworkMask {
        network: address & mask,
        mask,
    })
}

/// Returns the pre-CIDR default mask for an address.
///
/// Class A (`0xxx`) gets `/8`, class B (`10xx`) `/16` and class C (`110x`)
/// `/24`.
///
/// # Errors
///
/// Returns [`LookupError::UnknownAddressClass`] for class D and E addresses.
pub fn classful_mask(address: Ipv4Addr) -> Result<Ipv4Addr, LookupError> {
    let bits = address.to_bits();
    let mask: u32 = if bits & 0x8000_0000 == 0 {
        0xff00_0000
    } else if bits & 0xc000_0000 == 0x8000_0000 {
        0xffff_0000
    } else if bits & 0xe000_0000 == 0xc000_0000 {
        0xffff_ff00
    } else {
        return Err(LookupError::UnknownAddressClass { address });
    };
    Ok(Ipv4Addr::from_bits(mask))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Query backed by fixed answers that counts how often it is consulted.
    struct FixedQuery {
        address: Option<Ipv4Addr>,
        netmask: Ipv4Addr,
        calls: Cell<usize>,
    }

    impl FixedQuery {
        fn new(address: &str, netmask: &str) -> Self {
            Self {
                address: Some(address.parse().unwrap()),
                netmask: netmask.parse().unwrap(),
                calls: Cell::new(0),
            }
        }

        fn unassigned() -> Self {
            Self {
                address: None,
                netmask: Ipv4Addr::UNSPECIFIED,
                calls: Cell::new(0),
            }
        }
    }

    impl Ipv4Query for FixedQuery {
        fn address(&self, device: &str) -> Result<Ipv4Addr, LookupError> {
            self.calls.set(self.calls.get() + 1);
            self.address.ok_or_else(|| LookupError::AddressNotAssigned {
                device: device.to_string(),
            })
        }

        fn netmask(&self, _device: &str) -> Result<Ipv4Addr, LookupError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.netmask)
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn absent_device_is_catch_all() {
            let query = FixedQuery::new("192.168.1.10", "255.255.255.0");

            assert_eq!(resolve(&query, None).unwrap(), NetworkMask::ANY);
            assert_eq!(query.calls.get(), 0);
        }

        #[test]
        fn any_device_is_catch_all() {
            let query = FixedQuery::new("192.168.1.10", "255.255.255.0");

            assert_eq!(resolve(&query, Some("any")).unwrap(), NetworkMask::ANY);
            assert_eq!(query.calls.get(), 0);
        }

        #[test]
        fn reported_mask_is_used_as_is() {
            let query = FixedQuery::new("172.20.5.9", "255.255.240.0");

            let result = resolve(&query, Some("eth0")).unwrap();

            assert_eq!(result.network, Ipv4Addr::new(172, 20, 0, 0));
            assert_eq!(result.mask, Ipv4Addr::new(255, 255, 240, 0));
            assert_eq!(result.prefix_len(), 20);
        }

        #[test]
        fn class_c_address_with_zero_mask() {
            let query = FixedQuery::new("192.168.1.10", "0.0.0.0");

            let result = resolve(&query, Some("eth0")).unwrap();

            assert_eq!(result.mask, Ipv4Addr::new(255, 255, 255, 0));
            assert_eq!(result.network, Ipv4Addr::new(192, 168, 1, 0));
        }

        #[test]
        fn class_a_address_with_zero_mask() {
            let query = FixedQuery::new("10.0.0.5", "0.0.0.0");

            let result = resolve(&query, Some("eth0")).unwrap();

            assert_eq!(result.mask, Ipv4Addr::new(255, 0, 0, 0));
            assert_eq!(result.network, Ipv4Addr::new(10, 0, 0, 0));
        }

        #[test]
        fn unassigned_address_is_distinct_error() {
            let query = FixedQuery::unassigned();

            let error = resolve(&query, Some("eth3")).unwrap_err();

            assert!(matches!(error, LookupError::AddressNotAssigned { .. }));
            assert_eq!(error.to_string(), "eth3: no IPv4 address assigned");
        }

        #[test]
        fn multicast_address_with_zero_mask_has_unknown_class() {
            let query = FixedQuery::new("224.0.0.1", "0.0.0.0");

            let error = resolve(&query, Some("eth0")).unwrap_err();

            assert!(matches!(error, LookupError::UnknownAddressClass { .. }));
            assert_eq!(error.to_string(), "inet class for 0xe0000001 unknown");
        }
    }

    mod classful {
        use super::*;

        #[test]
        fn class_boundaries() {
            let cases = [
                ("0.0.0.1", Some("255.0.0.0")),
                ("127.255.255.255", Some("255.0.0.0")),
                ("128.0.0.1", Some("255.255.0.0")),
                ("191.255.0.1", Some("255.255.0.0")),
                ("192.0.0.1", Some("255.255.255.0")),
                ("223.255.255.1", Some("255.255.255.0")),
                ("224.0.0.1", None),
                ("240.0.0.1", None),
                ("255.255.255.255", None),
            ];

            for (address, expected) in cases {
                let result = classful_mask(address.parse().unwrap()).ok();
                let expected = expected.map(|m| m.parse::<Ipv4Addr>().unwrap());
                assert_eq!(result, expected, "address {address}");
            }
        }

        #[test]
        fn network_for_keeps_nonzero_mask_for_class_d() {
            let result =
                network_for(Ipv4Addr::new(224, 0, 0, 1), Ipv4Addr::new(240, 0, 0, 0)).unwrap();
            assert_eq!(result.network, Ipv4Addr::new(224, 0, 0, 0));
        }
    }

    mod display {
        use super::*;

        #[test]
        fn network_mask_displays_both_parts() {
            let value = NetworkMask {
                network: Ipv4Addr::new(10, 0, 0, 0),
                mask: Ipv4Addr::new(255, 0, 0, 0),
            };
            assert_eq!(value.to_string(), "10.0.0.0 mask 255.0.0.0");
        }

        #[test]
        fn catch_all_detection() {
            assert!(is_catch_all(None));
            assert!(is_catch_all(Some("any")));
            assert!(!is_catch_all(Some("eth0")));
        }
    }
}
