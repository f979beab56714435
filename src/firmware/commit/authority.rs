use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, warn};

use super::super::config::{ClockCommitChannels, ClockView};
use super::super::telemetry;
use super::super::time_convert::{
    calendar_from_registers, date_time_registers, time_from_registers, time_registers,
};
use super::super::types::{
    CalendarTime, ClockCommitAck, ClockCommitMessage, TimeOfDay, TimeOfDayMessage,
};
use super::rtc::RtcRegisters;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthorityMessage {
    DateTime(ClockCommitMessage),
    TimeOfDay(TimeOfDayMessage),
}

/// Waits for the next commit request of either kind.
pub async fn next_message<M: RawMutex>(channels: &ClockCommitChannels<M>) -> AuthorityMessage {
    match select(channels.date_time.receive(), channels.time_of_day.receive()).await {
        Either::First(message) => AuthorityMessage::DateTime(message),
        Either::Second(message) => AuthorityMessage::TimeOfDay(message),
    }
}

/// Sole owner of the hardware clock. Every write is followed by a read-back,
/// and the ack reflects what the clock reports, not what was sent.
pub struct TimeAuthority<'a, R: RtcRegisters, M: RawMutex> {
    rtc: R,
    channels: &'a ClockCommitChannels<M>,
    view: &'a ClockView<M>,
    cached: Option<CalendarTime>,
}

impl<'a, R: RtcRegisters, M: RawMutex> TimeAuthority<'a, R, M> {
    pub fn new(rtc: R, channels: &'a ClockCommitChannels<M>, view: &'a ClockView<M>) -> Self {
        let mut authority = Self {
            rtc,
            channels,
            view,
            cached: None,
        };
        authority.reload(0);
        authority
    }

    pub const fn cached(&self) -> Option<CalendarTime> {
        self.cached
    }

    pub const fn channels(&self) -> &'a ClockCommitChannels<M> {
        self.channels
    }

    pub fn rtc(&self) -> &R {
        &self.rtc
    }

    pub fn handle_date_time(&mut self, message: ClockCommitMessage) -> ClockCommitAck {
        let Some(requested) = message.decode() else {
            warn!("rtc: commit_decode_failed bytes={:?}", message.bytes);
            return ClockCommitAck::REJECTED;
        };
        // Out-of-range dates go to the hardware and fail the read-back; a
        // weekday that contradicts a valid date never reaches it.
        if let Some(derived) = requested.derived_weekday() {
            if derived != requested.weekday {
                warn!(
                    "rtc: weekday_mismatch requested={:?} derived={:?}",
                    requested.weekday, derived
                );
                return ClockCommitAck::REJECTED;
            }
        }
        let registers = match date_time_registers(&requested) {
            Ok(registers) => registers,
            Err(err) => {
                warn!("rtc: commit_encode_failed err={}", err);
                return ClockCommitAck::REJECTED;
            }
        };
        if let Err(err) = self.rtc.write_date_time(&registers) {
            warn!("rtc: write_failed kind=date_time err={}", err);
            self.reload(self.offset_minutes());
            return ClockCommitAck::REJECTED;
        }

        self.reload(requested.utc_offset_minutes);
        let ok = self
            .cached
            .is_some_and(|confirmed| confirms_date_time(&requested, &confirmed));
        if ok {
            info!(
                "rtc: committed date={:04}-{:02}-{:02} time={:02}:{:02}:{:02} offset_min={}",
                requested.year,
                requested.month,
                requested.day,
                requested.hour,
                requested.minute,
                requested.second,
                requested.utc_offset_minutes
            );
        } else {
            warn!(
                "rtc: readback_mismatch requested_month={} requested_day={} readback={:?}",
                requested.month, requested.day, self.cached
            );
        }
        ClockCommitAck::from_ok(ok)
    }

    pub fn handle_time_of_day(&mut self, message: TimeOfDayMessage) -> ClockCommitAck {
        let requested = message.decode();
        let registers = match time_registers(requested) {
            Ok(registers) => registers,
            Err(err) => {
                warn!("rtc: commit_encode_failed err={}", err);
                return ClockCommitAck::REJECTED;
            }
        };
        if let Err(err) = self.rtc.write_time(&registers) {
            warn!("rtc: write_failed kind=time_of_day err={}", err);
            return ClockCommitAck::REJECTED;
        }

        let readback = self
            .rtc
            .read_time()
            .ok()
            .and_then(|registers| time_from_registers(&registers));
        self.reload(self.offset_minutes());
        let ok = readback.is_some_and(|confirmed| confirms_time(requested, confirmed));
        if ok {
            info!(
                "rtc: committed time={:02}:{:02}:{:02}",
                requested.hour, requested.minute, requested.second
            );
        } else {
            warn!(
                "rtc: readback_mismatch requested_hour={} readback={:?}",
                requested.hour, readback
            );
        }
        ClockCommitAck::from_ok(ok)
    }

    /// Handles one request and answers on the ack queue without waiting.
    pub fn handle(&mut self, message: AuthorityMessage) -> ClockCommitAck {
        let ack = match message {
            AuthorityMessage::DateTime(message) => self.handle_date_time(message),
            AuthorityMessage::TimeOfDay(message) => self.handle_time_of_day(message),
        };
        telemetry::record_commit(ack.is_accepted());
        // A reply the requester gave up on is stale; replace it.
        while self.channels.acks.try_receive().is_ok() {
            debug!("rtc: stale_ack_replaced");
        }
        if self.channels.acks.try_send(ack.0).is_err() {
            warn!("rtc: ack_dropped ack={}", ack.0);
        }
        ack
    }

    /// Drains whatever requests are already queued. Returns how many were
    /// served.
    pub fn process_pending(&mut self) -> usize {
        let mut served = 0usize;
        loop {
            let message = if let Ok(message) = self.channels.date_time.try_receive() {
                AuthorityMessage::DateTime(message)
            } else if let Ok(message) = self.channels.time_of_day.try_receive() {
                AuthorityMessage::TimeOfDay(message)
            } else {
                return served;
            };
            self.handle(message);
            served += 1;
        }
    }

    /// Software one-second tick: advances the cached view without touching
    /// the hardware.
    pub fn on_second_tick(&mut self) {
        let Some(current) = self.cached else {
            return;
        };
        self.cached = current.plus_seconds(1);
        if self.cached.is_none() {
            warn!("rtc: tick_overflow year={}", current.year);
        }
        self.view.publish(self.cached);
    }

    fn offset_minutes(&self) -> i16 {
        self.cached.map_or(0, |time| time.utc_offset_minutes)
    }

    fn reload(&mut self, utc_offset_minutes: i16) {
        self.cached = match self.rtc.read_date_time() {
            Ok(registers) => calendar_from_registers(&registers, utc_offset_minutes),
            Err(err) => {
                warn!("rtc: read_failed err={}", err);
                None
            }
        };
        self.view.publish(self.cached);
    }
}

// The clock may tick between the write and the read-back.
fn confirms_date_time(requested: &CalendarTime, readback: &CalendarTime) -> bool {
    readback == requested || requested.plus_seconds(1).as_ref() == Some(readback)
}

fn confirms_time(requested: TimeOfDay, readback: TimeOfDay) -> bool {
    let secs = |t: TimeOfDay| t.hour as u32 * 3_600 + t.minute as u32 * 60 + t.second as u32;
    let delta = (secs(readback) + 86_400 - secs(requested)) % 86_400;
    requested.is_valid() && delta <= 1
}
