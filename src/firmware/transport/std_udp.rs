use core::net::Ipv4Addr;
use std::io;
use std::net::{SocketAddrV4, UdpSocket};
use std::time::Duration;

use log::{debug, warn};

use super::super::types::{TransportError, TransportErrorKind};
use super::{ReceiveOutcome, UdpTransport};

/// Host transport over one `UdpSocket` per attempt. The socket is
/// re-connected to the target on every call; std exposes no shutdown for UDP,
/// so reconnecting is what drops the previous addressing.
pub struct StdUdpTransport {
    socket: UdpSocket,
}

impl StdUdpTransport {
    pub fn bind() -> Result<Self, TransportError> {
        Self::bind_to(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }

    pub fn bind_to(local: SocketAddrV4) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).map_err(|err| {
            warn!("udp: bind_failed local={} err={}", local, err);
            io_error(TransportErrorKind::Socket, &err)
        })?;
        Ok(Self { socket })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|addr| addr.port())
    }

    fn target(&self, address: Ipv4Addr, port: u16) -> Result<(), TransportError> {
        self.socket
            .connect(SocketAddrV4::new(address, port))
            .map_err(|err| io_error(TransportErrorKind::Socket, &err))
    }
}

impl UdpTransport for StdUdpTransport {
    fn send(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &[u8],
        wait_us: u32,
    ) -> Result<usize, TransportError> {
        self.target(address, port)?;
        self.socket
            .set_write_timeout(Some(wait_bound(wait_us)))
            .map_err(|err| io_error(TransportErrorKind::Poll, &err))?;
        match self.socket.send(buffer) {
            Ok(sent) => Ok(sent),
            Err(err) if is_wait_timeout(&err) => {
                debug!("udp: send_wait_timeout wait_us={}", wait_us);
                Ok(0)
            }
            Err(err) => {
                warn!("udp: send_failed target={}:{} err={}", address, port, err);
                Err(io_error(TransportErrorKind::Send, &err))
            }
        }
    }

    fn receive(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &mut [u8],
        wait_us: u32,
    ) -> Result<ReceiveOutcome, TransportError> {
        self.target(address, port)?;
        self.socket
            .set_read_timeout(Some(wait_bound(wait_us)))
            .map_err(|err| io_error(TransportErrorKind::Poll, &err))?;
        match self.socket.recv(buffer) {
            Ok(received) => Ok(ReceiveOutcome::Received(received)),
            Err(err) if is_wait_timeout(&err) => Ok(ReceiveOutcome::Timeout),
            Err(err) => {
                warn!("udp: receive_failed target={}:{} err={}", address, port, err);
                Err(io_error(TransportErrorKind::Receive, &err))
            }
        }
    }
}

// std refuses a zero timeout.
fn wait_bound(wait_us: u32) -> Duration {
    Duration::from_micros(wait_us.max(1) as u64)
}

fn is_wait_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn io_error(kind: TransportErrorKind, err: &io::Error) -> TransportError {
    TransportError::new(kind, err.raw_os_error().unwrap_or(0))
}
