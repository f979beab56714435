use core::fmt;

use super::super::types::{CalendarTime, TimeOfDay, Weekday};

pub const RTC_YEAR_BASE: u16 = 2000;
pub const RTC_YEAR_MAX: u16 = 2099;

/// Hardware clock date/time block, BCD encoded:
/// `year - 2000`, `month`, `day`, `weekday`, `hour`, `minute`, `second`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DateTimeRegisters {
    pub bytes: [u8; 7],
}

/// Hardware clock time block, BCD encoded: `hour`, `minute`, `second`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeRegisters {
    pub bytes: [u8; 3],
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterError {
    YearOutOfRange(u16),
    NotEncodable,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YearOutOfRange(year) => {
                write!(f, "year {year} outside {RTC_YEAR_BASE}..={RTC_YEAR_MAX}")
            }
            Self::NotEncodable => f.write_str("field does not fit a BCD register"),
        }
    }
}

/// Encodes calendar fields into the register block. Only representability
/// is checked; the clock itself decides whether the values are acceptable.
pub fn date_time_registers(time: &CalendarTime) -> Result<DateTimeRegisters, RegisterError> {
    if !(RTC_YEAR_BASE..=RTC_YEAR_MAX).contains(&time.year) {
        return Err(RegisterError::YearOutOfRange(time.year));
    }
    let year = (time.year - RTC_YEAR_BASE) as u8;
    Ok(DateTimeRegisters {
        bytes: [
            to_bcd(year)?,
            to_bcd(time.month)?,
            to_bcd(time.day)?,
            to_bcd(time.weekday.as_u8())?,
            to_bcd(time.hour)?,
            to_bcd(time.minute)?,
            to_bcd(time.second)?,
        ],
    })
}

pub fn time_registers(time: TimeOfDay) -> Result<TimeRegisters, RegisterError> {
    Ok(TimeRegisters {
        bytes: [to_bcd(time.hour)?, to_bcd(time.minute)?, to_bcd(time.second)?],
    })
}

/// Decodes a register block read back from the clock. Returns `None` for
/// malformed BCD or a weekday the hardware should never report.
pub fn calendar_from_registers(
    registers: &DateTimeRegisters,
    utc_offset_minutes: i16,
) -> Option<CalendarTime> {
    let b = &registers.bytes;
    Some(CalendarTime {
        year: RTC_YEAR_BASE + from_bcd(b[0])? as u16,
        month: from_bcd(b[1])?,
        day: from_bcd(b[2])?,
        weekday: Weekday::from_u8(from_bcd(b[3])?)?,
        hour: from_bcd(b[4])?,
        minute: from_bcd(b[5])?,
        second: from_bcd(b[6])?,
        utc_offset_minutes,
    })
}

pub fn time_from_registers(registers: &TimeRegisters) -> Option<TimeOfDay> {
    Some(TimeOfDay {
        hour: from_bcd(registers.bytes[0])?,
        minute: from_bcd(registers.bytes[1])?,
        second: from_bcd(registers.bytes[2])?,
    })
}

fn to_bcd(value: u8) -> Result<u8, RegisterError> {
    if value >= 100 {
        return Err(RegisterError::NotEncodable);
    }
    Ok(((value / 10) << 4) | (value % 10))
}

fn from_bcd(value: u8) -> Option<u8> {
    let high = value >> 4;
    let low = value & 0x0F;
    if high > 9 || low > 9 {
        return None;
    }
    Some(high * 10 + low)
}
