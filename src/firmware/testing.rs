//! Scripted doubles for the network processor and the protocol engine.

use core::cell::Cell;
use core::net::Ipv4Addr;
use core::sync::atomic::{AtomicBool, Ordering};
use std::collections::VecDeque;
use std::rc::Rc;

use super::engine::{EngineStatus, SntpCallbacks, SntpEngine, SNTP_PACKET_BASE_SIZE};
use super::orchestrator::{SyncPlatform, XorShift32};
use super::runtime::FrameSync;
use super::transport::{ReceiveOutcome, UdpTransport};
use super::types::{LeapSecondInfo, NetworkTimestamp, ServerDescriptor, TransportError};

/// Shared I/O counters, readable after the platform moved into an
/// orchestrator.
#[derive(Default, Debug)]
pub(crate) struct IoLog {
    pub transports: Cell<u32>,
    pub resolves: Cell<u32>,
    pub sends: Cell<u32>,
    pub receives: Cell<u32>,
}

fn bump(counter: &Cell<u32>) {
    counter.set(counter.get() + 1);
}

pub(crate) struct FakeTransport {
    log: Rc<IoLog>,
}

impl UdpTransport for FakeTransport {
    fn send(
        &mut self,
        _address: Ipv4Addr,
        _port: u16,
        buffer: &[u8],
        _wait_us: u32,
    ) -> Result<usize, TransportError> {
        bump(&self.log.sends);
        Ok(buffer.len())
    }

    fn receive(
        &mut self,
        _address: Ipv4Addr,
        _port: u16,
        _buffer: &mut [u8],
        _wait_us: u32,
    ) -> Result<ReceiveOutcome, TransportError> {
        bump(&self.log.receives);
        Ok(ReceiveOutcome::Timeout)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum ReceiveStep {
    Pending,
    Fail(EngineStatus),
    Respond(NetworkTimestamp),
}

/// Engine that replays scripted send and receive results while still going
/// through the callbacks for I/O.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedEngine {
    sends: VecDeque<Result<(), EngineStatus>>,
    receives: VecDeque<ReceiveStep>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(mut self, result: Result<(), EngineStatus>) -> Self {
        self.sends.push_back(result);
        self
    }

    pub fn receive(mut self, step: ReceiveStep) -> Self {
        self.receives.push_back(step);
        self
    }
}

impl SntpEngine for ScriptedEngine {
    fn send_time_request(
        &mut self,
        server: &ServerDescriptor,
        callbacks: &mut dyn SntpCallbacks,
        _random: u32,
        _block_ms: u32,
    ) -> Result<(), EngineStatus> {
        let _ = callbacks.local_time();
        let scripted = self.sends.pop_front().unwrap_or(Ok(()));
        if scripted.is_ok() {
            let address = server.address.unwrap_or(Ipv4Addr::UNSPECIFIED);
            callbacks
                .transport_send(address, server.port, &[0u8; SNTP_PACKET_BASE_SIZE])
                .map_err(EngineStatus::NetworkFailure)?;
        }
        scripted
    }

    fn receive_time_response(
        &mut self,
        server: &ServerDescriptor,
        callbacks: &mut dyn SntpCallbacks,
        _block_ms: u32,
    ) -> Result<(), EngineStatus> {
        let address = server.address.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let mut buffer = [0u8; SNTP_PACKET_BASE_SIZE];
        callbacks
            .transport_receive(address, server.port, &mut buffer)
            .map_err(EngineStatus::NetworkFailure)?;
        match self.receives.pop_front().unwrap_or(ReceiveStep::Pending) {
            ReceiveStep::Pending => Err(EngineStatus::NoResponseReceived),
            ReceiveStep::Fail(status) => Err(status),
            ReceiveStep::Respond(time) => {
                if callbacks.set_local_time(server, time, 0, LeapSecondInfo::NoLeapSecond) {
                    Ok(())
                } else {
                    Err(EngineStatus::ClockUpdateFailed)
                }
            }
        }
    }
}

pub(crate) struct FakePlatform {
    pub log: Rc<IoLog>,
    pub script: ScriptedEngine,
    pub resolvable: bool,
    pub unix_seconds: Option<i64>,
    pub open_error: Option<TransportError>,
    rng: XorShift32,
}

impl FakePlatform {
    pub fn new(script: ScriptedEngine) -> Self {
        Self {
            log: Rc::new(IoLog::default()),
            script,
            resolvable: true,
            unix_seconds: Some(1_700_000_000),
            open_error: None,
            rng: XorShift32::new(7),
        }
    }
}

impl SyncPlatform for FakePlatform {
    type Transport = FakeTransport;
    type Engine = ScriptedEngine;

    fn open_transport(&mut self) -> Result<FakeTransport, TransportError> {
        if let Some(err) = self.open_error {
            return Err(err);
        }
        bump(&self.log.transports);
        Ok(FakeTransport {
            log: self.log.clone(),
        })
    }

    fn new_engine(&mut self, _response_timeout_ms: u32) -> ScriptedEngine {
        self.script.clone()
    }

    fn resolve(&mut self, _name: &str) -> Option<Ipv4Addr> {
        bump(&self.log.resolves);
        self.resolvable.then_some(Ipv4Addr::new(192, 0, 2, 1))
    }

    fn unix_seconds(&mut self) -> Option<i64> {
        self.unix_seconds
    }

    fn random_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }
}

/// Frame source that resolves immediately and can raise the exit flag after
/// a number of frames.
pub(crate) struct CountingFrame<'a> {
    pub frames: u32,
    trip: Option<(u32, &'a AtomicBool)>,
}

impl<'a> CountingFrame<'a> {
    pub fn new() -> Self {
        Self {
            frames: 0,
            trip: None,
        }
    }

    pub fn tripping(after: u32, exit: &'a AtomicBool) -> Self {
        Self {
            frames: 0,
            trip: Some((after, exit)),
        }
    }
}

impl FrameSync for CountingFrame<'_> {
    async fn wait_frame(&mut self) {
        self.frames += 1;
        if let Some((after, exit)) = self.trip {
            if self.frames >= after {
                exit.store(true, Ordering::Relaxed);
            }
        }
    }
}
