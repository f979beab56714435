//! Seam to the externally supplied SNTP protocol engine. The engine builds
//! and validates packets; everything it needs from the device goes through
//! [`SntpCallbacks`].

mod callbacks;

use core::fmt;
use core::net::Ipv4Addr;

use super::transport::ReceiveOutcome;
use super::types::{
    LeapSecondInfo, NetworkTimestamp, ProtocolErrorCode, ServerDescriptor, TransportError,
};

pub use callbacks::SyncCallbacks;

/// Size of a basic SNTP packet without extension fields.
pub const SNTP_PACKET_BASE_SIZE: usize = 48;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EngineStatus {
    /// Receive poll found nothing yet; poll again.
    NoResponseReceived,
    SendTimeout,
    ResponseTimeout,
    DnsFailure,
    NetworkFailure(TransportError),
    RejectedResponse(u32),
    InvalidResponse,
    /// The engine accepted a response but the device refused to apply it.
    ClockUpdateFailed,
}

impl EngineStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NoResponseReceived => "no_response",
            Self::SendTimeout => "send_timeout",
            Self::ResponseTimeout => "response_timeout",
            Self::DnsFailure => "dns_failure",
            Self::NetworkFailure(_) => "network_failure",
            Self::RejectedResponse(_) => "rejected_response",
            Self::InvalidResponse => "invalid_response",
            Self::ClockUpdateFailed => "clock_update_failed",
        }
    }

    pub(crate) const fn protocol_error(&self) -> Option<ProtocolErrorCode> {
        match self {
            Self::RejectedResponse(code) => Some(ProtocolErrorCode::RejectedResponse(*code)),
            Self::InvalidResponse => Some(ProtocolErrorCode::InvalidResponse),
            _ => None,
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkFailure(err) => write!(f, "network_failure {err}"),
            Self::RejectedResponse(code) => write!(f, "rejected_response code=0x{code:08x}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Device services the protocol engine calls back into.
pub trait SntpCallbacks {
    fn resolve_name(&mut self, name: &str) -> Option<Ipv4Addr>;

    /// Current host time, used to stamp outgoing requests.
    fn local_time(&mut self) -> NetworkTimestamp;

    /// Called once per trusted server response. Returns whether the time was
    /// accepted for commit.
    fn set_local_time(
        &mut self,
        server: &ServerDescriptor,
        server_time: NetworkTimestamp,
        clock_offset_ms: i64,
        leap: LeapSecondInfo,
    ) -> bool;

    fn transport_send(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &[u8],
    ) -> Result<usize, TransportError>;

    fn transport_receive(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &mut [u8],
    ) -> Result<ReceiveOutcome, TransportError>;
}

/// Request/response half of an SNTP client, one context per attempt.
pub trait SntpEngine {
    /// Sends one time request to `server`, tagging it with `random` for
    /// response correlation. May block for up to `block_ms` waiting on the
    /// transport.
    fn send_time_request(
        &mut self,
        server: &ServerDescriptor,
        callbacks: &mut dyn SntpCallbacks,
        random: u32,
        block_ms: u32,
    ) -> Result<(), EngineStatus>;

    /// Polls for the response to the last request. `Ok(())` means the engine
    /// validated a response and handed it to
    /// [`SntpCallbacks::set_local_time`].
    fn receive_time_response(
        &mut self,
        server: &ServerDescriptor,
        callbacks: &mut dyn SntpCallbacks,
        block_ms: u32,
    ) -> Result<(), EngineStatus>;
}
