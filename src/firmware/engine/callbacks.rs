use core::net::Ipv4Addr;

use log::{debug, info, warn};

use super::super::orchestrator::SyncPlatform;
use super::super::time_convert::{from_network_timestamp, network_to_unix_seconds, NetworkClock};
use super::super::transport::{ReceiveOutcome, UdpTransport};
use super::super::types::{
    CalendarTime, LeapSecondInfo, NetworkTimestamp, ProtocolErrorCode, ServerDescriptor,
    TransportError,
};
use super::SntpCallbacks;

/// Callback set for one attempt. Owns that attempt's transport; the
/// converted server time is parked here until the orchestrator commits it.
pub struct SyncCallbacks<'a, P: SyncPlatform> {
    platform: &'a mut P,
    transport: P::Transport,
    clock: &'a mut NetworkClock,
    send_poll_us: u32,
    receive_poll_us: u32,
    utc_offset_minutes: i16,
    accepted: Option<Result<CalendarTime, ProtocolErrorCode>>,
}

impl<'a, P: SyncPlatform> SyncCallbacks<'a, P> {
    pub fn new(
        platform: &'a mut P,
        transport: P::Transport,
        clock: &'a mut NetworkClock,
        send_poll_us: u32,
        receive_poll_us: u32,
        utc_offset_minutes: i16,
    ) -> Self {
        Self {
            platform,
            transport,
            clock,
            send_poll_us,
            receive_poll_us,
            utc_offset_minutes,
            accepted: None,
        }
    }

    pub(crate) fn random_u32(&mut self) -> u32 {
        self.platform.random_u32()
    }

    /// Server time converted by the last `set_local_time`, if any.
    pub fn take_accepted(&mut self) -> Option<Result<CalendarTime, ProtocolErrorCode>> {
        self.accepted.take()
    }
}

impl<P: SyncPlatform> SntpCallbacks for SyncCallbacks<'_, P> {
    fn resolve_name(&mut self, name: &str) -> Option<Ipv4Addr> {
        let resolved = self.platform.resolve(name);
        match resolved {
            Some(address) => debug!("ntpsync: resolved server={} addr={}", name, address),
            None => warn!("ntpsync: resolve_failed server={}", name),
        }
        resolved
    }

    fn local_time(&mut self) -> NetworkTimestamp {
        let read = self.platform.unix_seconds();
        self.clock.stamp(read)
    }

    fn set_local_time(
        &mut self,
        server: &ServerDescriptor,
        server_time: NetworkTimestamp,
        clock_offset_ms: i64,
        leap: LeapSecondInfo,
    ) -> bool {
        if leap != LeapSecondInfo::NoLeapSecond {
            info!("ntpsync: leap_indicator server={} leap={:?}", server.name, leap);
        }
        match from_network_timestamp(server_time, self.utc_offset_minutes) {
            Ok(time) => {
                info!(
                    "ntpsync: server_time server={} unix={} offset_ms={} utc_offset_min={}",
                    server.name,
                    network_to_unix_seconds(server_time).unwrap_or_default(),
                    clock_offset_ms,
                    self.utc_offset_minutes
                );
                self.accepted = Some(Ok(time));
                true
            }
            Err(code) => {
                warn!(
                    "ntpsync: server_time_rejected server={} seconds={} code={}",
                    server.name, server_time.seconds, code
                );
                self.accepted = Some(Err(code));
                false
            }
        }
    }

    fn transport_send(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &[u8],
    ) -> Result<usize, TransportError> {
        self.transport.send(address, port, buffer, self.send_poll_us)
    }

    fn transport_receive(
        &mut self,
        address: Ipv4Addr,
        port: u16,
        buffer: &mut [u8],
    ) -> Result<ReceiveOutcome, TransportError> {
        self.transport.receive(address, port, buffer, self.receive_poll_us)
    }
}
