//! Interface enumeration and IPv4 queries through socket ioctls.
//!
//! `SIOCGIFCONF` returns a flat buffer of `ifreq`-shaped records, one per
//! configured address. Each record is followed up with per-name queries for
//! flags, netmask, broadcast and destination address.

use std::io;
use std::mem::size_of;
use std::net::Ipv4Addr;
use std::os::fd::AsRawFd;

use socket2::{Domain, Socket, Type};

use crate::network::lookup::{Ipv4Query, LookupError};
use crate::network::{
    AddressLength, AddressSink, AddressSource, DiscoveryError, InterfaceEntry, InterfaceFlags,
    SockAddr, SockaddrRef,
};

const IFNAMSIZ: usize = libc::IFNAMSIZ;
const IFREQ_SIZE: usize = size_of::<libc::ifreq>();

/// Initial size of the `SIOCGIFCONF` buffer.
pub const DEFAULT_CONF_BUFFER: usize = 8192;

/// Kernel `struct ifconf`: buffer length followed by the buffer pointer.
#[repr(C)]
struct IfConf {
    ifc_len: libc::c_int,
    ifc_buf: *mut libc::c_char,
}

fn control_socket() -> io::Result<Socket> {
    Socket::new(Domain::IPV4, Type::DGRAM, None)
}

/// Request numbers are `c_ulong` on glibc and `c_int` on musl.
#[allow(clippy::unnecessary_cast, clippy::cast_sign_loss)]
mod request {
    pub const SIOCGIFCONF: u64 = libc::SIOCGIFCONF as u64;
    pub const SIOCGIFFLAGS: u64 = libc::SIOCGIFFLAGS as u64;
    pub const SIOCGIFADDR: u64 = libc::SIOCGIFADDR as u64;
    pub const SIOCGIFNETMASK: u64 = libc::SIOCGIFNETMASK as u64;
    pub const SIOCGIFBRDADDR: u64 = libc::SIOCGIFBRDADDR as u64;
    pub const SIOCGIFDSTADDR: u64 = libc::SIOCGIFDSTADDR as u64;
}

/// Issues `request` on `socket` with an in/out argument.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::unnecessary_cast
)]
fn ioctl<T>(socket: &Socket, request: u64, arg: &mut T) -> io::Result<()> {
    // SAFETY: `arg` is a live, exclusively borrowed structure of the shape
    // `request` expects.
    let rc = unsafe { libc::ioctl(socket.as_raw_fd(), request as _, std::ptr::from_mut(arg)) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Builds a zeroed request carrying `name`, or `None` if the name does not
/// fit `ifr_name` or contains a NUL byte.
fn request_for(name: &[u8]) -> Option<libc::ifreq> {
    if name.len() >= IFNAMSIZ || name.contains(&0) {
        return None;
    }
    // SAFETY: `ifreq` is plain data; all-zero is a valid value.
    let mut request: libc::ifreq = unsafe { std::mem::zeroed() };
    for (slot, &byte) in request.ifr_name.iter_mut().zip(name) {
        *slot = byte as libc::c_char;
    }
    Some(request)
}

/// Views a socket address stored inside an `ifreq` union.
fn union_address(request: &libc::ifreq, convention: AddressLength) -> Option<SockaddrRef<'_>> {
    // SAFETY: every union member read here is a `sockaddr`; the view is
    // bounded by the size of the union.
    let storage = unsafe {
        std::slice::from_raw_parts(
            std::ptr::from_ref(&request.ifr_ifru).cast::<u8>(),
            size_of_val(&request.ifr_ifru),
        )
    };
    SockaddrRef::within(storage, convention)
}

fn set_union_address(request: &mut libc::ifreq, address: SockaddrRef<'_>) {
    // SAFETY: the union is at least as large as a generic `sockaddr` and the
    // copy is bounded by the union size.
    unsafe {
        let len = address.len().min(size_of_val(&request.ifr_ifru));
        std::ptr::copy_nonoverlapping(
            address.as_bytes().as_ptr(),
            std::ptr::from_mut(&mut request.ifr_ifru).cast::<u8>(),
            len,
        );
    }
}

// ============================================================================
// SIOCGIFCONF buffer
// ============================================================================

/// Fetches the interface configuration, growing the buffer until it fits.
///
/// The result only counts as complete when the kernel left room for at
/// least one more record; a buffer filled to the brim may have been
/// truncated. `EINVAL` also means "too small".
fn load_conf(socket: &Socket, initial: usize) -> Result<Vec<u8>, DiscoveryError> {
    let mut size = initial.max(IFREQ_SIZE);
    loop {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|_| DiscoveryError::allocation("interface configuration buffer"))?;
        buffer.resize(size, 0);

        let mut conf = IfConf {
            ifc_len: libc::c_int::try_from(size)
                .map_err(|_| DiscoveryError::allocation("interface configuration buffer"))?,
            ifc_buf: buffer.as_mut_ptr().cast(),
        };
        let outcome = ioctl(socket, request::SIOCGIFCONF, &mut conf);

        match outcome {
            Err(e) if e.raw_os_error() != Some(libc::EINVAL) => {
                return Err(DiscoveryError::os("SIOCGIFCONF", None, e));
            }
            Ok(()) => {
                let used = usize::try_from(conf.ifc_len).unwrap_or(0).min(size);
                if used + IFREQ_SIZE <= size {
                    buffer.truncate(used);
                    return Ok(buffer);
                }
            }
            Err(_) => {}
        }

        tracing::debug!("SIOCGIFCONF buffer of {size} bytes may be truncated, growing");
        size = size
            .checked_mul(2)
            .ok_or_else(|| DiscoveryError::allocation("interface configuration buffer"))?;
    }
}

/// One record of a `SIOCGIFCONF` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfRecord<'a> {
    name: &'a [u8],
    address: SockaddrRef<'a>,
}

/// Walks the records of a `SIOCGIFCONF` buffer.
///
/// A record spans the name field plus the measured address, but never less
/// than one `ifreq`.
struct ConfRecords<'a> {
    rest: &'a [u8],
    convention: AddressLength,
}

impl<'a> ConfRecords<'a> {
    const fn new(buffer: &'a [u8], convention: AddressLength) -> Self {
        Self {
            rest: buffer,
            convention,
        }
    }
}

impl<'a> Iterator for ConfRecords<'a> {
    type Item = ConfRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest;
        let name_field = rest.get(..IFNAMSIZ)?;
        let address = SockaddrRef::within(&rest[IFNAMSIZ..], self.convention)?;

        let record_len = (IFNAMSIZ + address.len()).max(IFREQ_SIZE).min(rest.len());
        self.rest = &rest[record_len..];

        let name_len = name_field.iter().position(|&b| b == 0).unwrap_or(IFNAMSIZ);
        Some(ConfRecord {
            name: &name_field[..name_len],
            address,
        })
    }
}

// ============================================================================
// IoctlSource
// ============================================================================

/// Enumerates interface addresses with `SIOCGIFCONF` and per-name queries.
///
/// Only reports interfaces with an IPv4 address, since that is all the
/// Linux kernel lists here.
#[derive(Debug, Clone, Copy)]
pub struct IoctlSource {
    convention: AddressLength,
    initial_buffer: usize,
}

impl IoctlSource {
    /// Creates a source with the given address convention and initial
    /// buffer size.
    #[must_use]
    pub const fn new(convention: AddressLength, initial_buffer: usize) -> Self {
        Self {
            convention,
            initial_buffer,
        }
    }

    /// Queries one address attribute of `record`.
    ///
    /// `EADDRNOTAVAIL` means the attribute does not apply and yields `None`.
    fn attribute(
        &self,
        socket: &Socket,
        operation: &'static str,
        request: u64,
        record: &ConfRecord<'_>,
        name: &str,
    ) -> Result<Option<SockAddr>, DiscoveryError> {
        let Some(mut query) = request_for(record.name) else {
            return Ok(None);
        };
        set_union_address(&mut query, record.address);

        match ioctl(socket, request, &mut query) {
            Ok(()) => union_address(&query, self.convention)
                .map(|a| a.to_owned_copy())
                .transpose(),
            Err(e) => absent_or_fatal(operation, name, e).map(|()| None),
        }
    }

    /// Returns the flags of `name`, or `None` if it vanished mid-scan.
    fn flags(socket: &Socket, name: &str) -> Result<Option<InterfaceFlags>, DiscoveryError> {
        let Some(mut query) = request_for(name.as_bytes()) else {
            return Ok(None);
        };
        match ioctl(socket, request::SIOCGIFFLAGS, &mut query) {
            Ok(()) => {
                // SAFETY: SIOCGIFFLAGS fills `ifru_flags`.
                let raw = unsafe { query.ifr_ifru.ifru_flags };
                #[allow(clippy::cast_sign_loss)]
                let bits = u32::from(raw as u16);
                Ok(Some(InterfaceFlags::from_bits(bits)))
            }
            Err(e) => vanished_or_fatal(name, e).map(|()| None),
        }
    }

    fn attach_record(
        &self,
        socket: &Socket,
        record: &ConfRecord<'_>,
        sink: &mut dyn AddressSink,
    ) -> Result<(), DiscoveryError> {
        let Ok(name) = std::str::from_utf8(record.name) else {
            tracing::debug!("Skipping interface with non-UTF-8 name");
            return Ok(());
        };
        let Some(flags) = Self::flags(socket, name)? else {
            return Ok(());
        };
        if !flags.is_up() {
            tracing::debug!("Skipping {name}: interface is down");
            return Ok(());
        }

        let netmask = self.attribute(
            socket,
            "SIOCGIFNETMASK",
            request::SIOCGIFNETMASK,
            record,
            name,
        )?;
        let broadcast = if flags.is_broadcast() {
            self.attribute(
                socket,
                "SIOCGIFBRDADDR",
                request::SIOCGIFBRDADDR,
                record,
                name,
            )?
        } else {
            None
        };
        let destination = if flags.is_point_to_point() {
            self.attribute(
                socket,
                "SIOCGIFDSTADDR",
                request::SIOCGIFDSTADDR,
                record,
                name,
            )?
        } else {
            None
        };

        sink.attach(
            &InterfaceEntry::new(name, flags)
                .with_address(Some(record.address))
                .with_netmask(netmask.as_ref().map(SockAddr::as_sockaddr_ref))
                .with_broadcast(broadcast.as_ref().map(SockAddr::as_sockaddr_ref))
                .with_destination(destination.as_ref().map(SockAddr::as_sockaddr_ref)),
        )
    }
}

/// Sorts a failed attribute query into "does not apply" or fatal.
///
/// Only `EADDRNOTAVAIL` means the interface has no such attribute.
fn absent_or_fatal(
    operation: &'static str,
    name: &str,
    error: io::Error,
) -> Result<(), DiscoveryError> {
    if error.raw_os_error() == Some(libc::EADDRNOTAVAIL) {
        tracing::debug!("{operation}: {name}: not available");
        Ok(())
    } else {
        Err(DiscoveryError::os(operation, Some(name), error))
    }
}

/// Sorts a failed `SIOCGIFFLAGS` into "vanished mid-scan" or fatal.
///
/// Linux reports a missing name as `ENODEV`; BSD-derived stacks use `ENXIO`.
fn vanished_or_fatal(name: &str, error: io::Error) -> Result<(), DiscoveryError> {
    match error.raw_os_error() {
        Some(libc::ENODEV | libc::ENXIO) => {
            tracing::debug!("Skipping {name}: interface vanished");
            Ok(())
        }
        _ => Err(DiscoveryError::os("SIOCGIFFLAGS", Some(name), error)),
    }
}

impl Default for IoctlSource {
    fn default() -> Self {
        Self::new(AddressLength::host(), DEFAULT_CONF_BUFFER)
    }
}

impl AddressSource for IoctlSource {
    fn label(&self) -> &'static str {
        "ioctl"
    }

    fn scan(&self, sink: &mut dyn AddressSink) -> Result<(), DiscoveryError> {
        let socket = control_socket().map_err(|e| DiscoveryError::os("socket", None, e))?;
        let buffer = load_conf(&socket, self.initial_buffer)?;
        tracing::trace!("SIOCGIFCONF returned {} bytes", buffer.len());

        for record in ConfRecords::new(&buffer, self.convention) {
            self.attach_record(&socket, &record, sink)?;
        }
        Ok(())
    }
}

// ============================================================================
// IoctlIpv4Query
// ============================================================================

/// IPv4 address and netmask queries through `SIOCGIFADDR`/`SIOCGIFNETMASK`.
#[derive(Debug)]
pub struct IoctlIpv4Query {
    socket: Socket,
}

impl IoctlIpv4Query {
    /// Opens the transient datagram socket the queries run on.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Socket`] if the socket cannot be created.
    pub fn open() -> Result<Self, LookupError> {
        control_socket()
            .map(|socket| Self { socket })
            .map_err(LookupError::Socket)
    }

    fn query(&self, operation: &'static str, request: u64, device: &str) -> io::Result<Ipv4Addr> {
        let mut query = request_for(device.as_bytes())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENODEV))?;
        // Some kernels only answer when the family is preset.
        let family = SockAddr::from_ip(Ipv4Addr::UNSPECIFIED.into());
        set_union_address(&mut query, family.as_sockaddr_ref());

        ioctl(&self.socket, request, &mut query)?;
        tracing::trace!("{operation}: {device} answered");

        // SAFETY: both requests fill `ifru_addr` with a `sockaddr_in`.
        let sin = unsafe {
            std::ptr::read_unaligned(
                std::ptr::from_ref(&query.ifr_ifru.ifru_addr).cast::<libc::sockaddr_in>(),
            )
        };
        Ok(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
    }
}

impl Ipv4Query for IoctlIpv4Query {
    fn address(&self, device: &str) -> Result<Ipv4Addr, LookupError> {
        self.query("SIOCGIFADDR", request::SIOCGIFADDR, device)
            .map_err(|e| {
                if e.raw_os_error() == Some(libc::EADDRNOTAVAIL) {
                    LookupError::AddressNotAssigned {
                        device: device.to_string(),
                    }
                } else {
                    LookupError::OsQuery {
                        operation: "SIOCGIFADDR",
                        device: device.to_string(),
                        source: e,
                    }
                }
            })
    }

    fn netmask(&self, device: &str) -> Result<Ipv4Addr, LookupError> {
        self.query("SIOCGIFNETMASK", request::SIOCGIFNETMASK, device)
            .map_err(|e| LookupError::OsQuery {
                operation: "SIOCGIFNETMASK",
                device: device.to_string(),
                source: e,
            })
    }
}
