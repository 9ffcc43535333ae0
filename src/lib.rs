//! netdevs: capture device discovery
//!
//! A library for enumerating the network devices a packet capture could be
//! opened on, choosing a default capture device, and resolving a device's
//! IPv4 network number and mask.

#[cfg(not(unix))]
compile_error!("netdevs only supports Unix platforms");

pub mod config;
pub mod network;
