//! Address enumeration through a single `getifaddrs` call.

use std::io;
use std::mem::size_of;

use nix::ifaddrs::{InterfaceAddress, getifaddrs};
use nix::sys::socket::{SockaddrLike, SockaddrStorage};

use crate::network::{
    AddressLength, AddressSink, AddressSource, DiscoveryError, InterfaceEntry, InterfaceFlags,
    SockaddrRef,
};

/// Enumerates every interface address with one `getifaddrs` call.
///
/// Entries whose interface is not up are skipped. All other entries are
/// passed on in the order the operating system reports them.
#[derive(Debug, Clone, Copy)]
pub struct IfaddrsSource {
    convention: AddressLength,
}

impl IfaddrsSource {
    /// Creates a source that measures addresses with `convention`.
    #[must_use]
    pub const fn new(convention: AddressLength) -> Self {
        Self { convention }
    }

    /// Views the socket address held in `storage` with this source's
    /// length convention.
    fn view<'a>(&self, storage: Option<&'a SockaddrStorage>) -> Option<SockaddrRef<'a>> {
        let storage = storage?;
        // SAFETY: `SockaddrStorage` is a plain-data union of socket address
        // layouts, zero-filled before the OS address is copied in, so all of
        // its bytes are initialised and live as long as `storage`.
        let bytes = unsafe {
            std::slice::from_raw_parts(storage.as_ptr().cast::<u8>(), size_of::<SockaddrStorage>())
        };
        SockaddrRef::within(bytes, self.convention)
    }
}

impl Default for IfaddrsSource {
    fn default() -> Self {
        Self::new(AddressLength::host())
    }
}

impl AddressSource for IfaddrsSource {
    fn label(&self) -> &'static str {
        "getifaddrs"
    }

    fn scan(&self, sink: &mut dyn AddressSink) -> Result<(), DiscoveryError> {
        let entries =
            getifaddrs().map_err(|e| DiscoveryError::os("getifaddrs", None, io::Error::from(e)))?;

        for entry in entries {
            let Some(name) = usable_name(&entry.interface_name) else {
                tracing::debug!("Skipping interface with non-UTF-8 name");
                continue;
            };
            let flags = InterfaceFlags::from(entry.flags);
            if !flags.is_up() {
                tracing::debug!("Skipping {name}: interface is down");
                continue;
            }

            let (broadcast, destination) =
                route_shared_slot(flags, self.view(shared_slot(&entry)));

            sink.attach(
                &InterfaceEntry::new(name, flags)
                    .with_address(self.view(entry.address.as_ref()))
                    .with_netmask(self.view(entry.netmask.as_ref()))
                    .with_broadcast(broadcast)
                    .with_destination(destination),
            )?;
        }

        Ok(())
    }
}

/// Returns `name` unless it was not valid UTF-8.
///
/// `getifaddrs` names arrive lossily decoded, so a replacement character
/// marks a name that no longer matches the kernel's.
fn usable_name(name: &str) -> Option<&str> {
    (!name.contains(char::REPLACEMENT_CHARACTER)).then_some(name)
}

/// The broadcast/destination union of an entry, whichever side it landed on.
fn shared_slot(entry: &InterfaceAddress) -> Option<&SockaddrStorage> {
    entry.destination.as_ref().or(entry.broadcast.as_ref())
}

/// Splits the broadcast/destination union by interface flags.
///
/// The slot means broadcast on broadcast-capable interfaces and peer address
/// on point-to-point links; on any other interface it is ignored.
fn route_shared_slot(
    flags: InterfaceFlags,
    shared: Option<SockaddrRef<'_>>,
) -> (Option<SockaddrRef<'_>>, Option<SockaddrRef<'_>>) {
    (
        shared.filter(|_| flags.is_broadcast()),
        shared.filter(|_| flags.is_point_to_point()),
    )
}
