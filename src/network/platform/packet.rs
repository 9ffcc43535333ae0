//! Capture-session probes against the host.
//!
//! On Linux a probe opens a real `AF_PACKET` socket bound to the device,
//! configured with the requested frame budget, promiscuity and timeout.
//! Elsewhere it only checks that the interface index resolves.

use nix::net::if_::if_nametoindex;

use crate::network::{ANY_DEVICE, ProbeError};

/// Opens capture sessions on host interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketOpener;

/// Resolves `device` to its interface index.
///
/// The catch-all device maps to index 0 where the platform supports it.
fn interface_index(device: &str) -> Result<u32, ProbeError> {
    if cfg!(target_os = "linux") && device == ANY_DEVICE {
        return Ok(0);
    }
    if device.contains('\0') {
        return Err(ProbeError::InvalidName {
            device: device.to_string(),
        });
    }
    if_nametoindex(device).map_err(|_| ProbeError::NoSuchDevice {
        device: device.to_string(),
    })
}

#[cfg(target_os = "linux")]
mod linux {
    use std::io;
    use std::mem::size_of;
    use std::os::fd::AsRawFd;
    use std::ptr;

    use socket2::{Domain, Protocol, Socket, Type};

    use super::{PacketOpener, interface_index};
    use crate::network::{CaptureOpener, ProbeError, ProbeOptions};

    #[allow(clippy::cast_possible_truncation)]
    const ETH_P_ALL: u16 = libc::ETH_P_ALL as u16;

    /// Classic BPF `ret #k`: accept the first `k` bytes of every frame.
    const BPF_RET_K: u16 = 0x06;

    /// Kernel `struct packet_mreq`.
    #[repr(C)]
    struct PacketMembership {
        ifindex: libc::c_int,
        kind: libc::c_ushort,
        address_len: libc::c_ushort,
        address: [libc::c_uchar; 8],
    }

    fn set_option<T>(
        socket: &Socket,
        level: libc::c_int,
        name: libc::c_int,
        value: &T,
    ) -> io::Result<()> {
        #[allow(clippy::cast_possible_truncation)]
        let len = size_of::<T>() as libc::socklen_t;
        // SAFETY: `value` is a live `T` of exactly `len` bytes.
        let rc = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                level,
                name,
                ptr::from_ref(value).cast(),
                len,
            )
        };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    /// Truncates captured frames to `snaplen` bytes.
    fn attach_snaplen(socket: &Socket, snaplen: u32) -> io::Result<()> {
        let mut program = [libc::sock_filter {
            code: BPF_RET_K,
            jt: 0,
            jf: 0,
            k: snaplen,
        }];
        let fprog = libc::sock_fprog {
            len: 1,
            filter: program.as_mut_ptr(),
        };
        set_option(socket, libc::SOL_SOCKET, libc::SO_ATTACH_FILTER, &fprog)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn bind(socket: &Socket, ifindex: u32) -> io::Result<()> {
        // SAFETY: `sockaddr_ll` is plain data; all-zero is a valid value.
        let mut address: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        address.sll_family = libc::AF_PACKET as libc::c_ushort;
        address.sll_protocol = ETH_P_ALL.to_be();
        address.sll_ifindex = ifindex as libc::c_int;

        #[allow(clippy::cast_possible_truncation)]
        let len = size_of::<libc::sockaddr_ll>() as libc::socklen_t;
        // SAFETY: `address` is a fully initialised `sockaddr_ll` of `len` bytes.
        let rc = unsafe {
            libc::bind(
                socket.as_raw_fd(),
                ptr::from_ref(&address).cast::<libc::sockaddr>(),
                len,
            )
        };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    fn enable_promiscuous(socket: &Socket, ifindex: u32) -> io::Result<()> {
        let membership = PacketMembership {
            ifindex: ifindex as libc::c_int,
            kind: libc::PACKET_MR_PROMISC as libc::c_ushort,
            address_len: 0,
            address: [0; 8],
        };
        set_option(
            socket,
            libc::SOL_PACKET,
            libc::PACKET_ADD_MEMBERSHIP,
            &membership,
        )
    }

    fn classify(device: &str, error: io::Error) -> ProbeError {
        if error.raw_os_error() == Some(libc::ENODEV) {
            ProbeError::NoSuchDevice {
                device: device.to_string(),
            }
        } else {
            ProbeError::denied(device, error)
        }
    }

    impl CaptureOpener for PacketOpener {
        type Session = Socket;

        fn open(&self, device: &str, options: &ProbeOptions) -> Result<Socket, ProbeError> {
            let ifindex = interface_index(device)?;
            let protocol = Protocol::from(i32::from(ETH_P_ALL.to_be()));

            let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol))
                .map_err(|e| classify(device, e))?;
            attach_snaplen(&socket, options.snaplen).map_err(|e| classify(device, e))?;
            bind(&socket, ifindex).map_err(|e| classify(device, e))?;

            // Index 0 has no single link to put into promiscuous mode.
            if options.promiscuous && ifindex != 0 {
                enable_promiscuous(&socket, ifindex).map_err(|e| classify(device, e))?;
            }
            if !options.timeout.is_zero() {
                socket
                    .set_read_timeout(Some(options.timeout))
                    .map_err(|e| classify(device, e))?;
            }

            tracing::trace!("Opened packet socket on {device} (index {ifindex})");
            Ok(socket)
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl crate::network::CaptureOpener for PacketOpener {
    type Session = ();

    fn open(
        &self,
        device: &str,
        _options: &crate::network::ProbeOptions,
    ) -> Result<(), ProbeError> {
        interface_index(device).map(|_| ())
    }
}
