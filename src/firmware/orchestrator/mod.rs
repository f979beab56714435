//! Synchronization attempts: resolve, request, poll, convert, commit, all
//! bounded by a single retry counter.

mod platform;

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, warn};

use super::commit::ClockCommitter;
use super::config::{ClockCommitChannels, ClockView, SyncConfig};
use super::engine::{EngineStatus, SntpCallbacks, SntpEngine, SyncCallbacks};
use super::runtime::FrameSync;
use super::sync_state::{SyncApplyResult, SyncCommand, SyncSnapshot, SyncState, SyncStateEngine};
use super::telemetry;
use super::time_convert::NetworkClock;
use super::types::{CalendarTime, ProtocolErrorCode, ServerDescriptor, SyncAttemptResult};

#[cfg(feature = "std")]
pub use platform::StdPlatform;
pub use platform::{SyncPlatform, XorShift32};

enum SlotOutcome {
    Accepted(CalendarTime),
    Failed(SyncAttemptResult),
}

pub struct SyncOrchestrator<'a, P: SyncPlatform, M: RawMutex> {
    platform: P,
    config: SyncConfig,
    state: SyncStateEngine,
    committer: ClockCommitter<'a, M>,
    view: &'a ClockView<M>,
    exit: &'a AtomicBool,
    clock: NetworkClock,
}

impl<'a, P: SyncPlatform, M: RawMutex> SyncOrchestrator<'a, P, M> {
    pub fn new(
        platform: P,
        config: SyncConfig,
        channels: &'a ClockCommitChannels<M>,
        view: &'a ClockView<M>,
        exit: &'a AtomicBool,
    ) -> Self {
        Self {
            platform,
            state: SyncStateEngine::new(config.max_retries),
            committer: ClockCommitter::new(channels, config.ack_timeout_ms),
            config,
            view,
            exit,
            clock: NetworkClock::new(),
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.state.snapshot()
    }

    pub fn apply(&mut self, command: SyncCommand) -> SyncApplyResult {
        self.state.apply(command)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::Relaxed)
    }

    /// Raises the shared exit flag; a running attempt stops at its next
    /// check.
    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::Relaxed);
    }

    /// Runs one attempt if the state is `Syncing` and feeds its outcome back
    /// into the state machine.
    pub async fn run_attempt<F: FrameSync>(
        &mut self,
        frame: &mut F,
    ) -> Option<SyncAttemptResult> {
        let SyncState::Syncing { retries_remaining } = self.state.snapshot().state else {
            return None;
        };
        let result = self.attempt_sync(retries_remaining, frame).await;
        self.state.apply(SyncCommand::AttemptFinished(result));
        Some(result)
    }

    /// One attempt with at most `max_retries` request slots. Only progress is
    /// reported to the state machine; the caller applies the outcome.
    pub async fn attempt_sync<F: FrameSync>(
        &mut self,
        max_retries: u8,
        frame: &mut F,
    ) -> SyncAttemptResult {
        let result = if max_retries == 0 {
            debug!("ntpsync: attempt_skipped retries=0");
            SyncAttemptResult::Timeout
        } else {
            info!(
                "ntpsync: attempt_start server={}:{} retries={}",
                self.config.server, self.config.port, max_retries
            );
            self.run_slots(max_retries, frame).await
        };

        telemetry::record_attempt(&result);
        match result {
            SyncAttemptResult::Success(time) => info!(
                "ntpsync: attempt_success date={:04}-{:02}-{:02} time={:02}:{:02}:{:02}",
                time.year, time.month, time.day, time.hour, time.minute, time.second
            ),
            SyncAttemptResult::TransportError(err) => {
                warn!("ntpsync: attempt_failed result=transport_error {}", err)
            }
            SyncAttemptResult::ProtocolError(code) => {
                warn!("ntpsync: attempt_failed result=protocol_error {}", code)
            }
            other => warn!("ntpsync: attempt_failed result={}", other.label()),
        }
        result
    }

    async fn run_slots<F: FrameSync>(
        &mut self,
        max_retries: u8,
        frame: &mut F,
    ) -> SyncAttemptResult {
        let Some(mut server) = ServerDescriptor::new(&self.config.server, self.config.port) else {
            return SyncAttemptResult::ResolutionFailed;
        };
        let utc_offset_minutes = self.state.snapshot().offset.utc_offset_minutes();
        let mut engine = self.platform.new_engine(self.config.response_timeout_ms);
        let transport = match self.platform.open_transport() {
            Ok(transport) => transport,
            Err(err) => {
                warn!("udp: open_failed err={}", err);
                return SyncAttemptResult::TransportError(err);
            }
        };
        let mut callbacks = SyncCallbacks::new(
            &mut self.platform,
            transport,
            &mut self.clock,
            self.config.send_poll_us,
            self.config.receive_poll_us,
            utc_offset_minutes,
        );
        let max_polls = self.config.max_receive_polls.max(1);

        let mut last = SyncAttemptResult::Timeout;
        for slot in 0..max_retries {
            self.state.apply(SyncCommand::RetryConsumed {
                retries_remaining: max_retries - slot,
            });
            if Self::stop_requested(self.exit, frame) {
                return SyncAttemptResult::Cancelled;
            }

            let Some(address) = callbacks.resolve_name(server.name.as_str()) else {
                return SyncAttemptResult::ResolutionFailed;
            };
            server.address = Some(address);
            let nonce = callbacks.random_u32();

            let outcome = 'slot: {
                if let Err(status) = engine.send_time_request(
                    &server,
                    &mut callbacks,
                    nonce,
                    self.config.send_wait_ms,
                ) {
                    break 'slot SlotOutcome::Failed(status_result(status, &mut callbacks));
                }

                let mut polls = 0u32;
                loop {
                    match engine.receive_time_response(
                        &server,
                        &mut callbacks,
                        self.config.receive_wait_ms,
                    ) {
                        Ok(()) => break 'slot accepted_time(&mut callbacks),
                        Err(EngineStatus::NoResponseReceived) => {
                            polls += 1;
                            if polls >= max_polls {
                                debug!("ntpsync: receive_polls_exhausted polls={}", polls);
                                break 'slot SlotOutcome::Failed(SyncAttemptResult::Timeout);
                            }
                            frame.wait_frame().await;
                            if Self::stop_requested(self.exit, frame) {
                                return SyncAttemptResult::Cancelled;
                            }
                        }
                        Err(status) => {
                            break 'slot SlotOutcome::Failed(status_result(status, &mut callbacks))
                        }
                    }
                }
            };

            match outcome {
                SlotOutcome::Accepted(time) => {
                    return commit_calendar(&mut self.committer, self.view, time).await;
                }
                SlotOutcome::Failed(SyncAttemptResult::ResolutionFailed) => {
                    return SyncAttemptResult::ResolutionFailed;
                }
                SlotOutcome::Failed(result) => {
                    warn!(
                        "ntpsync: slot_failed slot={}/{} result={}",
                        slot + 1,
                        max_retries,
                        result.label()
                    );
                    last = result;
                }
            }

            if slot + 1 < max_retries {
                frame.wait_frame().await;
            }
        }
        last
    }

    fn stop_requested<F: FrameSync>(exit: &AtomicBool, frame: &F) -> bool {
        exit.load(Ordering::Relaxed) || frame.stop_requested()
    }
}

/// Commits a converted server time. The lighter time-of-day message is used
/// when the authority's view already holds the same date and offset.
pub(crate) async fn commit_calendar<M: RawMutex>(
    committer: &mut ClockCommitter<'_, M>,
    view: &ClockView<M>,
    time: CalendarTime,
) -> SyncAttemptResult {
    let date_current = view.get().is_some_and(|current| {
        current.same_date(&time) && current.utc_offset_minutes == time.utc_offset_minutes
    });
    let ack = if date_current {
        committer.commit_time_of_day(time.time_of_day()).await
    } else {
        committer.commit(&time).await
    };
    match ack {
        Ok(ack) if ack.is_accepted() => SyncAttemptResult::Success(time),
        Ok(_) => SyncAttemptResult::ProtocolError(ProtocolErrorCode::ClockRejected),
        Err(err) => SyncAttemptResult::ProtocolError(err.protocol_error()),
    }
}

fn accepted_time<P: SyncPlatform>(callbacks: &mut SyncCallbacks<'_, P>) -> SlotOutcome {
    match callbacks.take_accepted() {
        Some(Ok(time)) => SlotOutcome::Accepted(time),
        Some(Err(code)) => SlotOutcome::Failed(SyncAttemptResult::ProtocolError(code)),
        None => SlotOutcome::Failed(SyncAttemptResult::ProtocolError(
            ProtocolErrorCode::MissingServerTime,
        )),
    }
}

fn status_result<P: SyncPlatform>(
    status: EngineStatus,
    callbacks: &mut SyncCallbacks<'_, P>,
) -> SyncAttemptResult {
    match status {
        EngineStatus::NoResponseReceived
        | EngineStatus::SendTimeout
        | EngineStatus::ResponseTimeout => SyncAttemptResult::Timeout,
        EngineStatus::DnsFailure => SyncAttemptResult::ResolutionFailed,
        EngineStatus::NetworkFailure(err) => SyncAttemptResult::TransportError(err),
        EngineStatus::ClockUpdateFailed => match callbacks.take_accepted() {
            Some(Err(code)) => SyncAttemptResult::ProtocolError(code),
            _ => SyncAttemptResult::ProtocolError(ProtocolErrorCode::TimeNotSupported),
        },
        other => SyncAttemptResult::ProtocolError(
            other
                .protocol_error()
                .unwrap_or(ProtocolErrorCode::InvalidResponse),
        ),
    }
}
