//! Owned copies of variable-length socket addresses.
//!
//! Platforms disagree on how long a `struct sockaddr` is. BSD-derived systems
//! embed the length in the first byte of the structure, glibc derives it from
//! the address family, and older systems treat every address as a fixed-size
//! generic `sockaddr`. [`AddressLength`] captures that convention once so the
//! rest of the crate never has to branch on it.

use std::fmt;
use std::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Serialize, Serializer};

use super::DiscoveryError;

const AF_INET: u16 = libc::AF_INET as u16;
const AF_INET6: u16 = libc::AF_INET6 as u16;
const AF_UNIX: u16 = libc::AF_UNIX as u16;
#[cfg(any(target_os = "linux", target_os = "android"))]
const AF_PACKET: u16 = libc::AF_PACKET as u16;

/// Size of the generic `struct sockaddr` (family header plus 14 data bytes).
pub const GENERIC_SOCKADDR_LEN: usize = size_of::<libc::sockaddr>();

/// Offset of the IPv4 address inside a `sockaddr_in`.
const INET_ADDR_OFFSET: usize = 4;
/// Offset of the IPv6 address inside a `sockaddr_in6`.
const INET6_ADDR_OFFSET: usize = 8;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
mod header {
    /// `sa_len: u8` followed by `sa_family: u8`.
    pub const fn family(header: [u8; 2]) -> u16 {
        header[1] as u16
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn encode(len: u8, family: u16) -> [u8; 2] {
        [len, family as u8]
    }
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
)))]
mod header {
    /// `sa_family: u16` in native byte order, no length byte.
    pub const fn family(header: [u8; 2]) -> u16 {
        u16::from_ne_bytes(header)
    }

    pub const fn encode(_len: u8, family: u16) -> [u8; 2] {
        family.to_ne_bytes()
    }
}

/// How the byte length of a socket address is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLength {
    /// The first byte of the structure holds its length (`sa_len`).
    Embedded,
    /// The length follows from the address family, as glibc's `SA_LEN` does.
    ByFamily,
    /// Every address is the size of a generic `struct sockaddr`.
    Fixed,
}

impl AddressLength {
    /// Returns the convention used by the host's socket API.
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )) {
            Self::Embedded
        } else {
            Self::ByFamily
        }
    }

    /// Measures a socket address from its two header bytes.
    #[must_use]
    pub fn measure(self, header: [u8; 2]) -> usize {
        match self {
            Self::Embedded => usize::from(header[0]),
            Self::ByFamily => family_length(header::family(header)),
            Self::Fixed => GENERIC_SOCKADDR_LEN,
        }
    }
}

fn family_length(family: u16) -> usize {
    match family {
        AF_INET => size_of::<libc::sockaddr_in>(),
        AF_INET6 => size_of::<libc::sockaddr_in6>(),
        AF_UNIX => size_of::<libc::sockaddr_un>(),
        #[cfg(any(target_os = "linux", target_os = "android"))]
        AF_PACKET => size_of::<libc::sockaddr_ll>(),
        _ => GENERIC_SOCKADDR_LEN,
    }
}

/// A borrowed view of a socket address owned by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SockaddrRef<'a> {
    bytes: &'a [u8],
}

impl<'a> SockaddrRef<'a> {
    /// Views the socket address at the front of `storage`.
    ///
    /// The measured length is capped at the storage size, so a family whose
    /// structure is larger than the slot it was returned in is truncated
    /// rather than read past. Returns `None` if `storage` cannot even hold
    /// the two header bytes.
    #[must_use]
    pub fn within(storage: &'a [u8], convention: AddressLength) -> Option<Self> {
        let header: [u8; 2] = storage.get(..2)?.try_into().ok()?;
        let len = convention.measure(header).min(storage.len());
        Some(Self {
            bytes: &storage[..len],
        })
    }

    /// Views a raw socket address, or returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `sa` must point to a socket address that is readable for
    /// the full length `convention` reports and stays alive for `'a`.
    #[must_use]
    pub unsafe fn from_raw(sa: *const libc::sockaddr, convention: AddressLength) -> Option<Self> {
        if sa.is_null() {
            return None;
        }
        // SAFETY: the caller guarantees `sa` points to at least a header.
        let header = unsafe { std::ptr::read_unaligned(sa.cast::<[u8; 2]>()) };
        let len = convention.measure(header);
        // SAFETY: the caller guarantees `len` bytes are readable for `'a`.
        let bytes = unsafe { std::slice::from_raw_parts(sa.cast::<u8>(), len) };
        Some(Self { bytes })
    }

    /// Returns the measured bytes of the address.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the measured length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the measured length is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Makes an independent copy of exactly the measured bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::AllocationFailure`] if the copy cannot be
    /// allocated.
    pub fn to_owned_copy(&self) -> Result<SockAddr, DiscoveryError> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(self.bytes.len())
            .map_err(|_| DiscoveryError::allocation("socket address"))?;
        bytes.extend_from_slice(self.bytes);
        Ok(SockAddr { bytes })
    }
}

/// An independently owned copy of a socket address.
///
/// Serializes as the decoded IP address when the family is `AF_INET` or
/// `AF_INET6`, and as a short family/length description otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SockAddr {
    bytes: Vec<u8>,
}

impl SockAddr {
    /// Builds a socket address for an IP address with a zero port.
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::inet(v4),
            IpAddr::V6(v6) => Self::inet6(v6),
        }
    }

    fn inet(address: Ipv4Addr) -> Self {
        let len = size_of::<libc::sockaddr_in>();
        let mut bytes = vec![0u8; len];
        #[allow(clippy::cast_possible_truncation)]
        bytes[..2].copy_from_slice(&header::encode(len as u8, AF_INET));
        bytes[INET_ADDR_OFFSET..INET_ADDR_OFFSET + 4].copy_from_slice(&address.octets());
        Self { bytes }
    }

    fn inet6(address: Ipv6Addr) -> Self {
        let len = size_of::<libc::sockaddr_in6>();
        let mut bytes = vec![0u8; len];
        #[allow(clippy::cast_possible_truncation)]
        bytes[..2].copy_from_slice(&header::encode(len as u8, AF_INET6));
        bytes[INET6_ADDR_OFFSET..INET6_ADDR_OFFSET + 16].copy_from_slice(&address.octets());
        Self { bytes }
    }

    /// Borrows this copy as a [`SockaddrRef`].
    #[must_use]
    pub fn as_sockaddr_ref(&self) -> SockaddrRef<'_> {
        SockaddrRef { bytes: &self.bytes }
    }

    /// Returns the raw bytes of the copy.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the length of the copy in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the copy holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the address family, if the copy is long enough to carry one.
    #[must_use]
    pub fn family(&self) -> Option<u16> {
        let header: [u8; 2] = self.bytes.get(..2)?.try_into().ok()?;
        Some(header::family(header))
    }

    /// Decodes an IPv4 or IPv6 address.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        match self.family()? {
            AF_INET => {
                let octets: [u8; 4] = self
                    .bytes
                    .get(INET_ADDR_OFFSET..INET_ADDR_OFFSET + 4)?
                    .try_into()
                    .ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            AF_INET6 => {
                let octets: [u8; 16] = self
                    .bytes
                    .get(INET6_ADDR_OFFSET..INET6_ADDR_OFFSET + 16)?
                    .try_into()
                    .ok()?;
                Some(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => None,
        }
    }
}

impl From<IpAddr> for SockAddr {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

impl fmt::Display for SockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ip) = self.ip() {
            return write!(f, "{ip}");
        }
        match self.family() {
            Some(family) => write!(f, "<family {family}, {} bytes>", self.bytes.len()),
            None => write!(f, "<{} bytes>", self.bytes.len()),
        }
    }
}

impl Serialize for SockAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
