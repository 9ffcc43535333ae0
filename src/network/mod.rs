//! Network layer for discovering capture devices and their addresses.
//!
//! This module provides types and traits for:
//! - Owned socket address copies ([`SockAddr`])
//! - Device and address records ([`DeviceRecord`], [`AddressRecord`])
//! - The ordered device registry ([`DeviceRegistry`], [`RegistryBuilder`])
//! - Enumerating host addresses ([`AddressSource`])
//! - Probing devices with a capture session ([`CaptureOpener`])
//! - Discovery passes and default-device selection ([`DeviceFinder`])
//! - IPv4 network/mask resolution ([`lookup`])
//! - Platform-specific implementations ([`platform`])

mod device;
pub mod filter;
mod finder;
pub mod lookup;
pub mod platform;
mod probe;
mod registry;
mod sockaddr;
mod source;


pub use device::{
    ANY_DEVICE, AddressRecord, DeviceRecord, InterfaceFlags, LoopbackDetection, instance_number,
    looks_like_loopback,
};
pub use finder::DeviceFinder;
pub use lookup::{Ipv4Query, LookupError, NetworkMask};
pub use probe::{AcceptAll, CaptureOpener, ProbeError, ProbeOptions};
pub use registry::{DeviceRegistry, RegistryBuilder, Released};
pub use sockaddr::{AddressLength, GENERIC_SOCKADDR_LEN, SockAddr, SockaddrRef};
pub use source::{AddressSink, AddressSource, DiscoveryError, InterfaceEntry};
