
use core::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use super::types::SyncAttemptResult;

static SYNC_ATTEMPTS: AtomicU32 = AtomicU32::new(0);
static SYNC_SUCCESSES: AtomicU32 = AtomicU32::new(0);
static SYNC_TIMEOUTS: AtomicU32 = AtomicU32::new(0);
static SYNC_TRANSPORT_ERRORS: AtomicU32 = AtomicU32::new(0);
static SYNC_PROTOCOL_ERRORS: AtomicU32 = AtomicU32::new(0);
static SYNC_RESOLUTION_FAILURES: AtomicU32 = AtomicU32::new(0);
static SYNC_CANCELLATIONS: AtomicU32 = AtomicU32::new(0);
static RTC_COMMITS_ACCEPTED: AtomicU32 = AtomicU32::new(0);
static RTC_COMMITS_REJECTED: AtomicU32 = AtomicU32::new(0);
static RTC_ACK_WAITS: AtomicU32 = AtomicU32::new(0);
static RTC_ACK_WAIT_MS_TOTAL: AtomicU32 = AtomicU32::new(0);
static RTC_ACK_WAIT_MS_MAX: AtomicU32 = AtomicU32::new(0);

#[derive(Clone, Copy, Debug)]
pub struct Snapshot {
    pub sync_attempts: u32,
    pub sync_successes: u32,
    pub sync_timeouts: u32,
    pub sync_transport_errors: u32,
    pub sync_protocol_errors: u32,
    pub sync_resolution_failures: u32,
    pub sync_cancellations: u32,
    pub rtc_commits_accepted: u32,
    pub rtc_commits_rejected: u32,
    pub rtc_ack_waits: u32,
    pub rtc_ack_wait_ms_total: u32,
    pub rtc_ack_wait_ms_max: u32,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sync_attempts: SYNC_ATTEMPTS.load(Ordering::Relaxed),
        sync_successes: SYNC_SUCCESSES.load(Ordering::Relaxed),
        sync_timeouts: SYNC_TIMEOUTS.load(Ordering::Relaxed),
        sync_transport_errors: SYNC_TRANSPORT_ERRORS.load(Ordering::Relaxed),
        sync_protocol_errors: SYNC_PROTOCOL_ERRORS.load(Ordering::Relaxed),
        sync_resolution_failures: SYNC_RESOLUTION_FAILURES.load(Ordering::Relaxed),
        sync_cancellations: SYNC_CANCELLATIONS.load(Ordering::Relaxed),
        rtc_commits_accepted: RTC_COMMITS_ACCEPTED.load(Ordering::Relaxed),
        rtc_commits_rejected: RTC_COMMITS_REJECTED.load(Ordering::Relaxed),
        rtc_ack_waits: RTC_ACK_WAITS.load(Ordering::Relaxed),
        rtc_ack_wait_ms_total: RTC_ACK_WAIT_MS_TOTAL.load(Ordering::Relaxed),
        rtc_ack_wait_ms_max: RTC_ACK_WAIT_MS_MAX.load(Ordering::Relaxed),
    }
}

pub(crate) fn record_attempt(result: &SyncAttemptResult) {
    saturating_add_u32(&SYNC_ATTEMPTS, 1);
    let counter = match result {
        SyncAttemptResult::Success(_) => &SYNC_SUCCESSES,
        SyncAttemptResult::Timeout => &SYNC_TIMEOUTS,
        SyncAttemptResult::TransportError(_) => &SYNC_TRANSPORT_ERRORS,
        SyncAttemptResult::ProtocolError(_) => &SYNC_PROTOCOL_ERRORS,
        SyncAttemptResult::ResolutionFailed => &SYNC_RESOLUTION_FAILURES,
        SyncAttemptResult::Cancelled => &SYNC_CANCELLATIONS,
    };
    saturating_add_u32(counter, 1);
    debug!("telemetry sync_attempt result={}", result.label());
}

pub(crate) fn record_commit(accepted: bool) {
    if accepted {
        saturating_add_u32(&RTC_COMMITS_ACCEPTED, 1);
    } else {
        saturating_add_u32(&RTC_COMMITS_REJECTED, 1);
    }
}

pub(crate) fn record_ack_wait(elapsed_ms: u32) {
    saturating_add_u32(&RTC_ACK_WAITS, 1);
    saturating_add_u32(&RTC_ACK_WAIT_MS_TOTAL, elapsed_ms);
    update_max_u32(&RTC_ACK_WAIT_MS_MAX, elapsed_ms);
}

fn saturating_add_u32(counter: &AtomicU32, value: u32) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_add(value))
    });
}

fn update_max_u32(max_counter: &AtomicU32, value: u32) {
    let mut current = max_counter.load(Ordering::Relaxed);
    while value > current {
        match max_counter.compare_exchange_weak(
            current,
            value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(next) => current = next,
        }
    }
}
