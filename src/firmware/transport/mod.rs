//! Bounded-wait UDP primitives the protocol engine sends and receives
//! through.

#[cfg(feature = "std")]
mod std_udp;

use core::net::Ipv4Addr;

use super::types::TransportError;

#[cfg(feature = "std")]
pub use std_udp::StdUdpTransport;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReceiveOutcome {
    Received(usize),
    /// Nothing arrived within the wait bound. Expected while polling.
    Timeout,
}

/// Every call re-targets the socket at `address:port` before touching it, so
/// no addressing survives from one call to the next.
pub trait UdpTransport {
    /// Waits up to `wait_us` for the socket to accept the datagram. A wait
    /// timeout is reported as `Ok(0)`; the caller's retry loop resends.
    fn send(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &[u8],
        wait_us: u32,
    ) -> Result<usize, TransportError>;

    /// Waits up to `wait_us` for one datagram from `address:port`.
    fn receive(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &mut [u8],
        wait_us: u32,
    ) -> Result<ReceiveOutcome, TransportError>;
}
