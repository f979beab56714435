use core::fmt::{self, Write};

use super::calendar::MAX_UTC_OFFSET_MINUTES;

pub const OFFSET_HOURS_MIN: i8 = -16;
pub const OFFSET_HOURS_MAX: i8 = 16;
pub const OFFSET_MINUTES_MAX: u8 = 120;
pub const POSIX_TZ_MAX: usize = 16;

/// User-selected UTC offset.
///
/// `hours` and `minutes` are the display pair (`UTC+HH:MM`). Minutes above
/// 60 belong to the fine-grained input tier and simply add to the total; the
/// sign of `hours` applies to the whole offset. The POSIX accessors return
/// the sign-inverted form the host calendar expects.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct OffsetSpec {
    hours: i8,
    minutes: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OffsetError {
    HoursOutOfRange,
    MinutesOutOfRange,
    TotalOutOfRange,
}

impl fmt::Display for OffsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HoursOutOfRange => f.write_str("hours out of range"),
            Self::MinutesOutOfRange => f.write_str("minutes out of range"),
            Self::TotalOutOfRange => f.write_str("offset exceeds 16 hours"),
        }
    }
}

impl OffsetSpec {
    pub const UTC: Self = Self {
        hours: 0,
        minutes: 0,
    };

    pub(crate) fn new(hours: i8, minutes: u8) -> Result<Self, OffsetError> {
        if !(OFFSET_HOURS_MIN..=OFFSET_HOURS_MAX).contains(&hours) {
            return Err(OffsetError::HoursOutOfRange);
        }
        if minutes > OFFSET_MINUTES_MAX {
            return Err(OffsetError::MinutesOutOfRange);
        }
        let spec = Self { hours, minutes };
        if spec.utc_offset_minutes().unsigned_abs() > MAX_UTC_OFFSET_MINUTES as u16 {
            return Err(OffsetError::TotalOutOfRange);
        }
        Ok(spec)
    }

    pub const fn hours(&self) -> i8 {
        self.hours
    }

    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    pub const fn utc_offset_minutes(&self) -> i16 {
        let magnitude = (self.hours.unsigned_abs() as i16) * 60 + self.minutes as i16;
        if self.hours < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    pub const fn posix_hours(&self) -> i8 {
        -self.hours
    }

    pub const fn posix_minutes(&self) -> u8 {
        self.minutes
    }

    /// Minutes west of UTC, the POSIX `TZ` convention.
    pub const fn posix_offset_minutes(&self) -> i16 {
        -self.utc_offset_minutes()
    }

    /// `TZ` string for host calendar libraries, normalised to `H:MM`
    /// (`UTC-5:30` for a display offset of `UTC+05:30`).
    pub fn posix_tz(&self) -> heapless::String<POSIX_TZ_MAX> {
        let posix = self.posix_offset_minutes();
        let sign = if posix < 0 { '-' } else { '+' };
        let magnitude = posix.unsigned_abs();
        let mut out = heapless::String::new();
        let _ = write!(
            &mut out,
            "UTC{sign}{}:{:02}",
            magnitude / 60,
            magnitude % 60
        );
        out
    }
}

impl fmt::Display for OffsetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.hours < 0 { '-' } else { '+' };
        write!(
            f,
            "UTC{sign}{:02}:{:02}",
            self.hours.unsigned_abs(),
            self.minutes
        )
    }
}
