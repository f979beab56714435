use chrono::{DateTime, FixedOffset};

use super::super::types::CalendarTime;

/// The one place POSIX `TZ` strings are interpreted. Offsets here count
/// minutes west of UTC, so `UTC-5:30` is five and a half hours east.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PosixTz {
    posix_offset_minutes: i16,
}

impl PosixTz {
    pub fn parse(tz: &str) -> Option<Self> {
        let bytes = tz.as_bytes();
        let mut i = 0usize;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i < 3 {
            return None;
        }
        if i == bytes.len() {
            return Some(Self {
                posix_offset_minutes: 0,
            });
        }

        let negative = match bytes[i] {
            b'+' => {
                i += 1;
                false
            }
            b'-' => {
                i += 1;
                true
            }
            _ => false,
        };

        let (hours, next) = parse_digits(bytes, i, 2)?;
        i = next;
        let mut minutes = 0u16;
        if i < bytes.len() {
            if bytes[i] != b':' {
                return None;
            }
            let (value, next) = parse_digits(bytes, i + 1, 2)?;
            if next - (i + 1) != 2 || value >= 60 {
                return None;
            }
            minutes = value;
            i = next;
        }
        if i != bytes.len() || hours > 24 {
            return None;
        }

        let magnitude = (hours * 60 + minutes) as i16;
        Some(Self {
            posix_offset_minutes: if negative { -magnitude } else { magnitude },
        })
    }

    pub const fn posix_offset_minutes(&self) -> i16 {
        self.posix_offset_minutes
    }

    /// Local calendar fields for `unix_seconds` as the host calendar library
    /// would produce them under this zone.
    pub fn local_time(&self, unix_seconds: i64) -> Option<CalendarTime> {
        let zone = FixedOffset::west_opt(self.posix_offset_minutes as i32 * 60)?;
        let local = DateTime::from_timestamp(unix_seconds, 0)?
            .with_timezone(&zone)
            .naive_local();
        CalendarTime::from_naive(local, -self.posix_offset_minutes)
    }
}

fn parse_digits(bytes: &[u8], start: usize, max_len: usize) -> Option<(u16, usize)> {
    let mut i = start;
    let mut value = 0u16;
    while i < bytes.len() && i - start < max_len && bytes[i].is_ascii_digit() {
        value = value * 10 + (bytes[i] - b'0') as u16;
        i += 1;
    }
    if i == start {
        return None;
    }
    Some((value, i))
}
