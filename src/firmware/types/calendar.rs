use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

pub const MAX_UTC_OFFSET_MINUTES: i16 = 16 * 60;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Sunday),
            1 => Some(Self::Monday),
            2 => Some(Self::Tuesday),
            3 => Some(Self::Wednesday),
            4 => Some(Self::Thursday),
            5 => Some(Self::Friday),
            6 => Some(Self::Saturday),
            _ => None,
        }
    }

    pub(crate) const fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Sun => Self::Sunday,
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
        }
    }
}

/// Local wall-clock time as the hardware clock stores it, plus the UTC offset
/// that produced it. Fields are public so callers can build raw register
/// values; use [`CalendarTime::is_valid`] before trusting them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CalendarTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub utc_offset_minutes: i16,
}

impl CalendarTime {
    /// Builds a calendar value with the weekday derived from the date.
    pub fn from_fields(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        utc_offset_minutes: i16,
    ) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?;
        let time = TimeOfDay {
            hour,
            minute,
            second,
        };
        if !time.is_valid() || utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES as u16 {
            return None;
        }
        Some(Self {
            year,
            month,
            day,
            weekday: Weekday::from_chrono(date.weekday()),
            hour,
            minute,
            second,
            utc_offset_minutes,
        })
    }

    pub fn derived_weekday(&self) -> Option<Weekday> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .map(|date| Weekday::from_chrono(date.weekday()))
    }

    pub fn is_valid(&self) -> bool {
        self.derived_weekday() == Some(self.weekday)
            && self.time_of_day().is_valid()
            && self.utc_offset_minutes.unsigned_abs() <= MAX_UTC_OFFSET_MINUTES as u16
    }

    pub fn same_date(&self, other: &Self) -> bool {
        self.year == other.year && self.month == other.month && self.day == other.day
    }

    pub const fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        }
    }

    pub(crate) fn naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?.and_hms_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
        )
    }

    pub(crate) fn from_naive(local: NaiveDateTime, utc_offset_minutes: i16) -> Option<Self> {
        let year = u16::try_from(local.year()).ok()?;
        Some(Self {
            year,
            month: local.month() as u8,
            day: local.day() as u8,
            weekday: Weekday::from_chrono(local.weekday()),
            hour: local.hour() as u8,
            minute: local.minute() as u8,
            second: local.second() as u8,
            utc_offset_minutes,
        })
    }

    /// Same calendar value moved forward by whole seconds, as the software
    /// tick advances it.
    pub fn plus_seconds(&self, seconds: u32) -> Option<Self> {
        let local = self
            .naive()?
            .checked_add_signed(chrono::TimeDelta::seconds(seconds as i64))?;
        Self::from_naive(local, self.utc_offset_minutes)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60 && self.second < 60
    }
}
