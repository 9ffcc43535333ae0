//! Capture-session probing.
//!
//! A device is only worth listing if a capture session can actually be
//! opened on it. Discovery opens a minimal session on every candidate and
//! closes it straight away; a failure drops the candidate without reporting
//! an error.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Error type for a failed probe.
///
/// Never fatal: the registry treats any `ProbeError` as "omit this device".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The device does not exist.
    #[error("{device}: no such device exists")]
    NoSuchDevice {
        /// The probed device name.
        device: String,
    },

    /// The device name cannot be passed to the operating system.
    #[error("{device}: invalid device name")]
    InvalidName {
        /// The probed device name.
        device: String,
    },

    /// Opening the capture session failed (typically missing privileges).
    #[error("{device}: {source}")]
    Denied {
        /// The probed device name.
        device: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    /// Creates a `Denied` error.
    #[must_use]
    pub fn denied(device: &str, source: io::Error) -> Self {
        Self::Denied {
            device: device.to_string(),
            source,
        }
    }
}

/// Parameters of the probe session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Maximum bytes captured per frame.
    pub snaplen: u32,
    /// Whether to request promiscuous mode.
    pub promiscuous: bool,
    /// Read timeout; zero means block indefinitely.
    pub timeout: Duration,
}

impl ProbeOptions {
    /// Smallest useful frame budget: enough for link, IP and transport headers.
    pub const DEFAULT_SNAPLEN: u32 = 68;
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            snaplen: Self::DEFAULT_SNAPLEN,
            promiscuous: false,
            timeout: Duration::ZERO,
        }
    }
}

/// Opens and closes capture sessions.
///
/// Discovery only uses this as an existence and permission check; the
/// session is closed without ever reading from it.
pub trait CaptureOpener {
    /// Handle of an open session. Dropping it must close the session.
    type Session;

    /// Opens a capture session on `device`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the session cannot be opened.
    fn open(&self, device: &str, options: &ProbeOptions) -> Result<Self::Session, ProbeError>;

    /// Closes a session returned by [`CaptureOpener::open`].
    fn close(&self, session: Self::Session) {
        drop(session);
    }

    /// Opens then immediately closes a session on `device`.
    ///
    /// # Errors
    ///
    /// Returns the [`ProbeError`] from `open`.
    fn probe(&self, device: &str, options: &ProbeOptions) -> Result<(), ProbeError> {
        let session = self.open(device, options)?;
        self.close(session);
        Ok(())
    }
}

impl<T: CaptureOpener + ?Sized> CaptureOpener for &T {
    type Session = T::Session;

    fn open(&self, device: &str, options: &ProbeOptions) -> Result<Self::Session, ProbeError> {
        (*self).open(device, options)
    }

    fn close(&self, session: Self::Session) {
        (*self).close(session);
    }
}

/// Opener that accepts every device without touching the OS.
///
/// Used when probing is disabled, so unprivileged users still see the
/// enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CaptureOpener for AcceptAll {
    type Session = ();

    fn open(&self, _device: &str, _options: &ProbeOptions) -> Result<(), ProbeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct CountingOpener {
        opened: RefCell<Vec<String>>,
        closed: RefCell<usize>,
    }

    impl CaptureOpener for CountingOpener {
        type Session = String;

        fn open(&self, device: &str, _options: &ProbeOptions) -> Result<String, ProbeError> {
            if device == "missing0" {
                return Err(ProbeError::NoSuchDevice {
                    device: device.to_string(),
                });
            }
            self.opened.borrow_mut().push(device.to_string());
            Ok(device.to_string())
        }

        fn close(&self, _session: String) {
            *self.closed.borrow_mut() += 1;
        }
    }

    #[test]
    fn default_options_are_minimal() {
        let options = ProbeOptions::default();
        assert_eq!(options.snaplen, 68);
        assert!(!options.promiscuous);
        assert!(options.timeout.is_zero());
    }

    #[test]
    fn probe_opens_then_closes() {
        let opener = CountingOpener::default();

        opener.probe("eth0", &ProbeOptions::default()).unwrap();

        assert_eq!(opener.opened.borrow().as_slice(), ["eth0"]);
        assert_eq!(*opener.closed.borrow(), 1);
    }

    #[test]
    fn failed_probe_closes_nothing() {
        let opener = CountingOpener::default();

        let result = opener.probe("missing0", &ProbeOptions::default());

        assert!(matches!(result, Err(ProbeError::NoSuchDevice { .. })));
        assert_eq!(*opener.closed.borrow(), 0);
    }

    #[test]
    fn reference_delegates_to_inner_opener() {
        let opener = CountingOpener::default();
        let by_ref = &opener;

        by_ref.probe("wlan0", &ProbeOptions::default()).unwrap();

        assert_eq!(*opener.closed.borrow(), 1);
    }

    #[test]
    fn accept_all_accepts_anything() {
        assert!(AcceptAll.probe("nonexistent", &ProbeOptions::default()).is_ok());
    }

    #[test]
    fn denied_displays_device_and_cause() {
        let error = ProbeError::denied("eth0", io::Error::other("Operation not permitted"));
        assert_eq!(error.to_string(), "eth0: Operation not permitted");
    }
}
