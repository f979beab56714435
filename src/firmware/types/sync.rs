use core::fmt;
use core::net::Ipv4Addr;

use super::calendar::CalendarTime;

pub const SERVER_NAME_MAX: usize = 64;

/// Time server for one attempt. `address` stays empty until resolution
/// succeeds.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ServerDescriptor {
    pub name: heapless::String<SERVER_NAME_MAX>,
    pub port: u16,
    pub address: Option<Ipv4Addr>,
}

impl ServerDescriptor {
    pub fn new(name: &str, port: u16) -> Option<Self> {
        let mut owned = heapless::String::new();
        owned.push_str(name).ok()?;
        Some(Self {
            name: owned,
            port,
            address: None,
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NetworkTimestamp {
    pub seconds: u32,
    pub fraction: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LeapSecondInfo {
    NoLeapSecond,
    LastMinuteHas61Seconds,
    LastMinuteHas59Seconds,
    AlarmServerNotSynchronized,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransportErrorKind {
    Socket,
    Poll,
    Send,
    Receive,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// Underlying OS or stack error code, `0` when the stack does not report
    /// one.
    pub code: i32,
}

impl TransportError {
    pub const fn new(kind: TransportErrorKind, code: i32) -> Self {
        Self { kind, code }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            TransportErrorKind::Socket => "socket",
            TransportErrorKind::Poll => "poll",
            TransportErrorKind::Send => "send",
            TransportErrorKind::Receive => "receive",
        };
        write!(f, "{label} failed code={}", self.code)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProtocolErrorCode {
    /// Server answered with a kiss-o'-death or otherwise refused the request.
    RejectedResponse(u32),
    InvalidResponse,
    /// Network seconds outside the window the conversion layer supports.
    TimeNotSupported,
    /// Engine reported success but never delivered a server time.
    MissingServerTime,
    ClockRejected,
    /// The time authority never took the commit off its queue.
    EnqueueTimeout,
    AckTimeout,
}

impl fmt::Display for ProtocolErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedResponse(code) => write!(f, "rejected_response code=0x{code:08x}"),
            Self::InvalidResponse => f.write_str("invalid_response"),
            Self::TimeNotSupported => f.write_str("time_not_supported"),
            Self::MissingServerTime => f.write_str("missing_server_time"),
            Self::ClockRejected => f.write_str("clock_rejected"),
            Self::EnqueueTimeout => f.write_str("enqueue_timeout"),
            Self::AckTimeout => f.write_str("ack_timeout"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncAttemptResult {
    Success(CalendarTime),
    Timeout,
    TransportError(TransportError),
    ProtocolError(ProtocolErrorCode),
    ResolutionFailed,
    Cancelled,
}

impl SyncAttemptResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Timeout => "timeout",
            Self::TransportError(_) => "transport_error",
            Self::ProtocolError(_) => "protocol_error",
            Self::ResolutionFailed => "resolution_failed",
            Self::Cancelled => "cancelled",
        }
    }
}
