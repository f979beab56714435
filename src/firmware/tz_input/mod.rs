//! Two-field UTC offset editor driven by directional keys.
//!
//! Hours step by one within `-16..=16`. Minutes step by 15 below 60 and by 1
//! from 60 up to 120, so `Up` from zero walks `15, 30, 45, 60, 61, ...`. An
//! edit that would push the total past 16 hours is dropped.


use log::{debug, warn};

use super::time_convert::encode_offset;
use super::types::{
    OffsetSpec, TzKey, MAX_UTC_OFFSET_MINUTES, OFFSET_HOURS_MAX, OFFSET_HOURS_MIN,
    OFFSET_MINUTES_MAX,
};

const MINUTE_TIER_START: u8 = 60;
const MINUTE_COARSE_STEP: u8 = 15;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TzField {
    Hour,
    Minute,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TzInputOutcome {
    Editing,
    Confirmed(OffsetSpec),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimezoneInput {
    field: TzField,
    hours: i8,
    minutes: u8,
}

impl Default for TimezoneInput {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneInput {
    pub const fn new() -> Self {
        Self {
            field: TzField::Hour,
            hours: 0,
            minutes: 0,
        }
    }

    pub const fn from_offset(offset: OffsetSpec) -> Self {
        Self {
            field: TzField::Hour,
            hours: offset.hours(),
            minutes: offset.minutes(),
        }
    }

    pub const fn field(&self) -> TzField {
        self.field
    }

    pub const fn hours(&self) -> i8 {
        self.hours
    }

    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn apply(&mut self, key: TzKey) -> TzInputOutcome {
        match key {
            TzKey::Left | TzKey::Right => {
                self.field = match self.field {
                    TzField::Hour => TzField::Minute,
                    TzField::Minute => TzField::Hour,
                };
            }
            TzKey::Up | TzKey::Down => {
                let (hours, minutes) = self.stepped(key == TzKey::Up);
                if within_limit(hours, minutes) {
                    self.hours = hours;
                    self.minutes = minutes;
                } else {
                    debug!(
                        "tzinput: edit_dropped hours={} minutes={}",
                        hours, minutes
                    );
                }
            }
            TzKey::Confirm => {
                return match encode_offset(self.hours, self.minutes) {
                    Ok(offset) => TzInputOutcome::Confirmed(offset),
                    Err(err) => {
                        warn!(
                            "tzinput: confirm_rejected hours={} minutes={} err={}",
                            self.hours, self.minutes, err
                        );
                        TzInputOutcome::Editing
                    }
                };
            }
        }
        TzInputOutcome::Editing
    }

    fn stepped(&self, up: bool) -> (i8, u8) {
        match self.field {
            TzField::Hour => {
                let hours = if up {
                    self.hours.saturating_add(1).min(OFFSET_HOURS_MAX)
                } else {
                    self.hours.saturating_sub(1).max(OFFSET_HOURS_MIN)
                };
                (hours, self.minutes)
            }
            TzField::Minute => {
                let minutes = match (up, self.minutes) {
                    (true, m) if m < MINUTE_TIER_START => m + MINUTE_COARSE_STEP,
                    (true, m) => m.saturating_add(1).min(OFFSET_MINUTES_MAX),
                    (false, m) if m > MINUTE_TIER_START => m - 1,
                    (false, m) => m.saturating_sub(MINUTE_COARSE_STEP),
                };
                (self.hours, minutes)
            }
        }
    }
}

fn within_limit(hours: i8, minutes: u8) -> bool {
    (hours.unsigned_abs() as i16) * 60 + minutes as i16 <= MAX_UTC_OFFSET_MINUTES
}
