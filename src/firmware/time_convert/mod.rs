//! Conversions between network timestamps, Unix seconds, calendar fields and
//! hardware clock registers. Nothing in here touches the network or the
//! clock hardware.

mod posix_tz;
mod registers;

use chrono::DateTime;
use log::warn;

use super::types::{
    CalendarTime, NetworkTimestamp, OffsetError, OffsetSpec, ProtocolErrorCode,
    MAX_UTC_OFFSET_MINUTES,
};

pub use posix_tz::PosixTz;
pub use registers::{
    calendar_from_registers, date_time_registers, time_registers, time_from_registers,
    DateTimeRegisters, RegisterError, TimeRegisters, RTC_YEAR_BASE, RTC_YEAR_MAX,
};

/// Seconds between 1900-01-01T00:00:00Z and 1970-01-01T00:00:00Z (RFC 868).
pub const NTP_UNIX_EPOCH_OFFSET_SECS: u32 = 2_208_988_800;
/// Era 1 network seconds for 2038-01-19T03:14:07Z, the last representable
/// instant.
pub const NTP_ERA1_LARGEST_SECS: u32 = 61_505_151;
/// Unix seconds at the first instant of network era 1 (2036-02-07T06:28:16Z).
pub const UNIX_SECS_AT_NTP_ERA1: i64 = 2_085_978_496;

pub fn to_network_timestamp(unix_seconds: i64) -> NetworkTimestamp {
    NetworkTimestamp {
        seconds: unix_seconds.wrapping_add(NTP_UNIX_EPOCH_OFFSET_SECS as i64) as u32,
        fraction: 0,
    }
}

pub fn network_to_unix_seconds(timestamp: NetworkTimestamp) -> Result<i64, ProtocolErrorCode> {
    let seconds = timestamp.seconds;
    if seconds > NTP_ERA1_LARGEST_SECS && seconds < NTP_UNIX_EPOCH_OFFSET_SECS {
        return Err(ProtocolErrorCode::TimeNotSupported);
    }
    if seconds >= NTP_UNIX_EPOCH_OFFSET_SECS {
        Ok((seconds - NTP_UNIX_EPOCH_OFFSET_SECS) as i64)
    } else {
        Ok(UNIX_SECS_AT_NTP_ERA1 + seconds as i64)
    }
}

pub fn from_network_timestamp(
    timestamp: NetworkTimestamp,
    utc_offset_minutes: i16,
) -> Result<CalendarTime, ProtocolErrorCode> {
    if utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES as u16 {
        return Err(ProtocolErrorCode::TimeNotSupported);
    }
    let unix_seconds = network_to_unix_seconds(timestamp)?;
    let local_seconds = unix_seconds + utc_offset_minutes as i64 * 60;
    let local = DateTime::from_timestamp(local_seconds, 0)
        .ok_or(ProtocolErrorCode::TimeNotSupported)?
        .naive_utc();
    CalendarTime::from_naive(local, utc_offset_minutes).ok_or(ProtocolErrorCode::TimeNotSupported)
}

/// Calendar fields for Unix seconds at UTC.
pub fn unix_to_calendar_utc(unix_seconds: i64) -> Option<CalendarTime> {
    let utc = DateTime::from_timestamp(unix_seconds, 0)?.naive_utc();
    CalendarTime::from_naive(utc, 0)
}

pub fn encode_offset(hours: i8, minutes: u8) -> Result<OffsetSpec, OffsetError> {
    OffsetSpec::new(hours, minutes)
}

/// Stamps outgoing requests from the host clock, falling back to the last
/// successful read when the clock cannot be read.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkClock {
    last_unix_seconds: i64,
}

impl NetworkClock {
    pub const fn new() -> Self {
        Self {
            last_unix_seconds: 0,
        }
    }

    pub fn stamp(&mut self, read: Option<i64>) -> NetworkTimestamp {
        match read {
            Some(unix_seconds) => self.last_unix_seconds = unix_seconds,
            None => warn!(
                "ntpsync: local_clock_read_failed fallback_unix={}",
                self.last_unix_seconds
            ),
        }
        to_network_timestamp(self.last_unix_seconds)
    }

    pub const fn last_unix_seconds(&self) -> i64 {
        self.last_unix_seconds
    }
}
