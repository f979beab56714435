//! Clock commit protocol between the network task and the time authority.

mod authority;
mod rtc;
#[cfg(test)]
mod tests;

use core::fmt;

use embassy_sync::{blocking_mutex::raw::RawMutex, channel::Channel};
use embassy_time::{with_timeout, Duration, Instant};
use log::{debug, info, warn};

use super::config::{ClockCommitChannels, COMMIT_ENQUEUE_TIMEOUT_MS};
use super::telemetry;
use super::types::{
    CalendarTime, ClockCommitAck, ClockCommitMessage, ProtocolErrorCode, TimeOfDay,
    TimeOfDayMessage,
};

pub use authority::{next_message, AuthorityMessage, TimeAuthority};
pub use rtc::{RtcError, RtcRegisters, SimulatedRtc};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommitError {
    /// The authority never took the request off its queue.
    EnqueueTimeout,
    AckTimeout,
}

impl CommitError {
    pub const fn protocol_error(self) -> ProtocolErrorCode {
        match self {
            Self::EnqueueTimeout => ProtocolErrorCode::EnqueueTimeout,
            Self::AckTimeout => ProtocolErrorCode::AckTimeout,
        }
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnqueueTimeout => f.write_str("enqueue_timeout"),
            Self::AckTimeout => f.write_str("ack_timeout"),
        }
    }
}

/// Network-side end of the commit channels. Requests and acks are matched by
/// queue alone, so `&mut self` keeps at most one commit in flight.
///
/// A request that timed out is withdrawn from its queue. If the authority
/// already took it, its late ack is awaited and discarded before the next
/// request goes out.
pub struct ClockCommitter<'a, M: RawMutex> {
    channels: &'a ClockCommitChannels<M>,
    ack_timeout: Duration,
    enqueue_timeout: Duration,
    unanswered: bool,
}

impl<'a, M: RawMutex> ClockCommitter<'a, M> {
    pub fn new(channels: &'a ClockCommitChannels<M>, ack_timeout_ms: u32) -> Self {
        Self {
            channels,
            ack_timeout: Duration::from_millis(ack_timeout_ms as u64),
            enqueue_timeout: Duration::from_millis(COMMIT_ENQUEUE_TIMEOUT_MS as u64),
            unanswered: false,
        }
    }

    /// Whether a request taken by the authority is still owed an ack.
    pub const fn awaiting_late_ack(&self) -> bool {
        self.unanswered
    }

    pub async fn commit(&mut self, time: &CalendarTime) -> Result<ClockCommitAck, CommitError> {
        let channels = self.channels;
        let message = ClockCommitMessage::encode(time);
        self.round_trip(&channels.date_time, message, "date_time")
            .await
    }

    pub async fn commit_time_of_day(
        &mut self,
        time: TimeOfDay,
    ) -> Result<ClockCommitAck, CommitError> {
        let channels = self.channels;
        let message = TimeOfDayMessage::encode(time);
        self.round_trip(&channels.time_of_day, message, "time_of_day")
            .await
    }

    async fn round_trip<T, const N: usize>(
        &mut self,
        requests: &Channel<M, T, N>,
        message: T,
        kind: &'static str,
    ) -> Result<ClockCommitAck, CommitError> {
        self.settle_late_ack().await;
        while self.channels.acks.try_receive().is_ok() {
            debug!("rtc: stale_ack_drained kind={}", kind);
        }

        if with_timeout(self.enqueue_timeout, requests.send(message))
            .await
            .is_err()
        {
            warn!(
                "rtc: commit_enqueue_timeout kind={} timeout_ms={}",
                kind,
                self.enqueue_timeout.as_millis()
            );
            return Err(CommitError::EnqueueTimeout);
        }

        let started = Instant::now();
        let ack = with_timeout(self.ack_timeout, self.channels.acks.receive()).await;
        telemetry::record_ack_wait(started.elapsed().as_millis() as u32);
        match ack {
            Ok(raw) => {
                let ack = ClockCommitAck(raw);
                if ack.is_accepted() {
                    info!("rtc: commit_acked kind={}", kind);
                } else {
                    warn!("rtc: commit_rejected kind={} ack={}", kind, raw);
                }
                Ok(ack)
            }
            Err(_) => {
                warn!(
                    "rtc: commit_ack_timeout kind={} timeout_ms={}",
                    kind,
                    self.ack_timeout.as_millis()
                );
                self.withdraw(requests, kind);
                Err(CommitError::AckTimeout)
            }
        }
    }

    fn withdraw<T, const N: usize>(&mut self, requests: &Channel<M, T, N>, kind: &'static str) {
        if requests.try_receive().is_ok() {
            debug!("rtc: unanswered_request_withdrawn kind={}", kind);
        } else if let Ok(raw) = self.channels.acks.try_receive() {
            debug!("rtc: late_ack_discarded kind={} ack={}", kind, raw);
        } else {
            self.unanswered = true;
        }
    }

    async fn settle_late_ack(&mut self) {
        if !core::mem::take(&mut self.unanswered) {
            return;
        }
        match with_timeout(self.ack_timeout, self.channels.acks.receive()).await {
            Ok(raw) => debug!("rtc: late_ack_discarded ack={}", raw),
            Err(_) => warn!("rtc: late_ack_missing"),
        }
    }
}
