//! Platform-specific discovery backends.
//!
//! This module selects, once, the implementations of [`AddressSource`],
//! [`CaptureOpener`] and [`Ipv4Query`](crate::network::Ipv4Query) that
//! match the host.
//!
//! # Platform Support
//!
//! - **All Unix**: `getifaddrs` enumeration ([`IfaddrsSource`]).
//! - **Linux**: `SIOCGIFCONF` enumeration ([`IoctlSource`]), packet-socket
//!   probes and ioctl-based IPv4 queries.
//! - **Other Unix**: probes only check that the interface index resolves;
//!   IPv4 network lookups are unsupported.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::lookup::{self, LookupError, NetworkMask};
use super::{
    AcceptAll, AddressLength, AddressSource, CaptureOpener, DiscoveryError, LoopbackDetection,
    ProbeError, ProbeOptions,
};

mod ifaddrs;
#[cfg(target_os = "linux")]
mod ioctl;
mod packet;

pub use ifaddrs::IfaddrsSource;
#[cfg(target_os = "linux")]
pub use ioctl::{DEFAULT_CONF_BUFFER, IoctlIpv4Query, IoctlSource};
pub use packet::PacketOpener;

/// Initial `SIOCGIFCONF` buffer size on platforms without the ioctl backend.
#[cfg(not(target_os = "linux"))]
pub const DEFAULT_CONF_BUFFER: usize = 8192;

/// How interface addresses are enumerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStrategy {
    /// The preferred strategy for the host (`getifaddrs`).
    #[default]
    Auto,
    /// One `getifaddrs` call.
    Getifaddrs,
    /// `SIOCGIFCONF` followed by per-interface queries.
    Ioctl,
}

impl ScanStrategy {
    /// Returns the configuration name of the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Getifaddrs => "getifaddrs",
            Self::Ioctl => "ioctl",
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host conventions resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// How socket address lengths are measured.
    pub address_length: AddressLength,
    /// How loopback devices are recognized.
    pub loopback: LoopbackDetection,
}

impl PlatformProfile {
    /// The conventions of the host this crate was built for.
    #[must_use]
    pub const fn host() -> Self {
        Self {
            address_length: AddressLength::host(),
            loopback: LoopbackDetection::FlagBit,
        }
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::host()
    }
}

/// Builds the address source for `strategy`.
///
/// `initial_buffer` only affects the `ioctl` strategy.
///
/// # Errors
///
/// Returns [`DiscoveryError::UnsupportedStrategy`] if the strategy is not
/// available on this platform.
pub fn select_source(
    strategy: ScanStrategy,
    profile: PlatformProfile,
    initial_buffer: usize,
) -> Result<Box<dyn AddressSource>, DiscoveryError> {
    let source: Box<dyn AddressSource> = match strategy {
        ScanStrategy::Auto | ScanStrategy::Getifaddrs => {
            Box::new(IfaddrsSource::new(profile.address_length))
        }
        #[cfg(target_os = "linux")]
        ScanStrategy::Ioctl => Box::new(IoctlSource::new(profile.address_length, initial_buffer)),
        #[cfg(not(target_os = "linux"))]
        ScanStrategy::Ioctl => {
            let _ = initial_buffer;
            return Err(DiscoveryError::UnsupportedStrategy {
                strategy: strategy.as_str(),
            });
        }
    };
    tracing::debug!("Using {} address source", source.label());
    Ok(source)
}

/// The preferred address source for the host.
#[must_use]
pub fn default_source() -> Box<dyn AddressSource> {
    Box::new(IfaddrsSource::default())
}

/// The capture opener used against the real host.
#[derive(Debug, Clone, Copy)]
pub enum HostOpener {
    /// Probe with a real capture session.
    Packet(PacketOpener),
    /// Accept every device without probing.
    Disabled(AcceptAll),
}

impl HostOpener {
    /// An opener that probes with real capture sessions.
    #[must_use]
    pub const fn packet() -> Self {
        Self::Packet(PacketOpener)
    }

    /// An opener that accepts everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::Disabled(AcceptAll)
    }

    /// Probes when `enabled`, accepts everything otherwise.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        if enabled {
            Self::packet()
        } else {
            Self::disabled()
        }
    }
}

impl CaptureOpener for HostOpener {
    type Session = Option<<PacketOpener as CaptureOpener>::Session>;

    fn open(&self, device: &str, options: &ProbeOptions) -> Result<Self::Session, ProbeError> {
        match self {
            Self::Packet(opener) => opener.open(device, options).map(Some),
            Self::Disabled(opener) => opener.open(device, options).map(|()| None),
        }
    }
}

/// Resolves the IPv4 network and mask of `device` on the host.
///
/// `None` and the catch-all device resolve to [`NetworkMask::ANY`] without
/// opening a socket.
///
/// # Errors
///
/// Returns [`LookupError`] if the socket cannot be opened, a query fails,
/// or a zero mask cannot be defaulted.
pub fn lookup_net(device: Option<&str>) -> Result<NetworkMask, LookupError> {
    if lookup::is_catch_all(device) {
        return Ok(NetworkMask::ANY);
    }

    #[cfg(target_os = "linux")]
    {
        let query = IoctlIpv4Query::open()?;
        lookup::resolve(&query, device)
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(LookupError::Unsupported)
    }
}
