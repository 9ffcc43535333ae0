//! Address enumeration traits and error types.

use std::io;

use thiserror::Error;

use super::InterfaceFlags;
use super::sockaddr::SockaddrRef;

/// Error type for device discovery.
///
/// Every variant is fatal to the discovery call that produced it. Conditions
/// that only drop a single candidate (a denied probe, an interface that is
/// down or vanished mid-scan, an attribute that does not apply) never become
/// a `DiscoveryError`.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A registry, name or address copy could not be allocated.
    #[error("malloc: cannot allocate {what}")]
    AllocationFailure {
        /// What was being allocated.
        what: &'static str,
    },

    /// An operating system query failed with an unrecoverable error.
    #[error("{operation}: {}{source}", interface_prefix(.interface))]
    OsQuery {
        /// The failing call, e.g. `getifaddrs` or `SIOCGIFNETMASK`.
        operation: &'static str,
        /// The interface being queried, if the call was per-interface.
        interface: Option<String>,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// No non-loopback device could be found.
    #[error("no suitable device found")]
    NoSuitableDevice,

    /// The requested scan strategy is not built for this platform.
    #[error("scan strategy '{strategy}' is not available on this platform")]
    UnsupportedStrategy {
        /// Name of the requested strategy.
        strategy: &'static str,
    },
}

fn interface_prefix(interface: &Option<String>) -> String {
    interface
        .as_deref()
        .map_or_else(String::new, |name| format!("{name}: "))
}

impl DiscoveryError {
    /// Creates an `AllocationFailure` error.
    #[must_use]
    pub const fn allocation(what: &'static str) -> Self {
        Self::AllocationFailure { what }
    }

    /// Creates an `OsQuery` error.
    #[must_use]
    pub fn os(operation: &'static str, interface: Option<&str>, source: io::Error) -> Self {
        Self::OsQuery {
            operation,
            interface: interface.map(str::to_string),
            source,
        }
    }
}

/// One raw address tuple reported by the operating system.
///
/// All four addresses borrow from OS-owned storage and are independently
/// optional; absent values are passed through unchanged, never defaulted.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceEntry<'a> {
    /// Interface name.
    pub name: &'a str,
    /// Interface flags at the time of the scan.
    pub flags: InterfaceFlags,
    pub address: Option<SockaddrRef<'a>>,
    pub netmask: Option<SockaddrRef<'a>>,
    pub broadcast: Option<SockaddrRef<'a>>,
    pub destination: Option<SockaddrRef<'a>>,
}

impl<'a> InterfaceEntry<'a> {
    /// Creates an entry with no addresses.
    #[must_use]
    pub const fn new(name: &'a str, flags: InterfaceFlags) -> Self {
        Self {
            name,
            flags,
            address: None,
            netmask: None,
            broadcast: None,
            destination: None,
        }
    }

    #[must_use]
    pub const fn with_address(mut self, address: Option<SockaddrRef<'a>>) -> Self {
        self.address = address;
        self
    }

    #[must_use]
    pub const fn with_netmask(mut self, netmask: Option<SockaddrRef<'a>>) -> Self {
        self.netmask = netmask;
        self
    }

    #[must_use]
    pub const fn with_broadcast(mut self, broadcast: Option<SockaddrRef<'a>>) -> Self {
        self.broadcast = broadcast;
        self
    }

    #[must_use]
    pub const fn with_destination(mut self, destination: Option<SockaddrRef<'a>>) -> Self {
        self.destination = destination;
        self
    }
}

/// Receives address tuples from an [`AddressSource`].
pub trait AddressSink {
    /// Attaches one address tuple to the device it names.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] on a fatal failure; the source must stop
    /// scanning and propagate it.
    fn attach(&mut self, entry: &InterfaceEntry<'_>) -> Result<(), DiscoveryError>;
}

/// Trait for enumerating the host's interface addresses.
///
/// # Design
///
/// - One implementation per enumeration strategy, chosen once at startup
/// - Sources skip interfaces that are not administratively up
/// - Enables dependency injection for testing with in-memory sources
///
/// # Example
///
/// ```ignore
/// use netdevs::network::{AddressSink, AddressSource, DiscoveryError};
///
/// struct EmptySource;
///
/// impl AddressSource for EmptySource {
///     fn label(&self) -> &'static str {
///         "empty"
///     }
///
///     fn scan(&self, _sink: &mut dyn AddressSink) -> Result<(), DiscoveryError> {
///         Ok(())
///     }
/// }
/// ```
pub trait AddressSource {
    /// Short name of the strategy, used in logs.
    fn label(&self) -> &'static str;

    /// Feeds every address of every up interface to `sink`, in OS order.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when an OS query fails unrecoverably or when
    /// `sink` reports a fatal error. Any OS resources held by the scan are
    /// released before returning.
    fn scan(&self, sink: &mut dyn AddressSink) -> Result<(), DiscoveryError>;
}

impl<T: AddressSource + ?Sized> AddressSource for Box<T> {
    fn label(&self) -> &'static str {
        self.as_ref().label()
    }

    fn scan(&self, sink: &mut dyn AddressSink) -> Result<(), DiscoveryError> {
        self.as_ref().scan(sink)
    }
}
