use super::calendar::{CalendarTime, TimeOfDay, Weekday};

pub const CLOCK_COMMIT_MESSAGE_LEN: usize = 10;
pub const TIME_OF_DAY_MESSAGE_LEN: usize = 3;

/// Full calendar commit as it crosses the processor boundary.
///
/// Layout: `year` (u16 LE), `month`, `day`, `weekday` (0 = Sunday), `hour`,
/// `minute`, `second`, `utc_offset_minutes` (i16 LE). Field values are copied
/// verbatim so the time authority sees exactly what the sender produced,
/// including out-of-range values the hardware is expected to refuse.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClockCommitMessage {
    pub bytes: [u8; CLOCK_COMMIT_MESSAGE_LEN],
}

impl ClockCommitMessage {
    pub fn encode(time: &CalendarTime) -> Self {
        let year = time.year.to_le_bytes();
        let offset = time.utc_offset_minutes.to_le_bytes();
        Self {
            bytes: [
                year[0],
                year[1],
                time.month,
                time.day,
                time.weekday.as_u8(),
                time.hour,
                time.minute,
                time.second,
                offset[0],
                offset[1],
            ],
        }
    }

    pub fn decode(&self) -> Option<CalendarTime> {
        let b = &self.bytes;
        Some(CalendarTime {
            year: u16::from_le_bytes([b[0], b[1]]),
            month: b[2],
            day: b[3],
            weekday: Weekday::from_u8(b[4])?,
            hour: b[5],
            minute: b[6],
            second: b[7],
            utc_offset_minutes: i16::from_le_bytes([b[8], b[9]]),
        })
    }
}

/// Time-of-day-only commit: `hour`, `minute`, `second`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeOfDayMessage {
    pub bytes: [u8; TIME_OF_DAY_MESSAGE_LEN],
}

impl TimeOfDayMessage {
    pub const fn encode(time: TimeOfDay) -> Self {
        Self {
            bytes: [time.hour, time.minute, time.second],
        }
    }

    pub const fn decode(&self) -> TimeOfDay {
        TimeOfDay {
            hour: self.bytes[0],
            minute: self.bytes[1],
            second: self.bytes[2],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClockCommitAck(pub u32);

impl ClockCommitAck {
    pub const ACCEPTED: Self = Self(1);
    pub const REJECTED: Self = Self(0);

    pub const fn from_ok(ok: bool) -> Self {
        if ok {
            Self::ACCEPTED
        } else {
            Self::REJECTED
        }
    }

    pub const fn is_accepted(self) -> bool {
        self.0 == 1
    }
}
