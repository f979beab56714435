use core::fmt;

use super::super::time_convert::{
    calendar_from_registers, time_from_registers, DateTimeRegisters, TimeRegisters,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RtcError {
    Bus,
    Busy,
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => f.write_str("bus"),
            Self::Busy => f.write_str("busy"),
        }
    }
}

/// Register-level access to the battery-backed clock. Only the time
/// authority holds an implementation.
pub trait RtcRegisters {
    fn write_date_time(&mut self, registers: &DateTimeRegisters) -> Result<(), RtcError>;
    fn read_date_time(&mut self) -> Result<DateTimeRegisters, RtcError>;
    fn write_time(&mut self, registers: &TimeRegisters) -> Result<(), RtcError>;
    fn read_time(&mut self) -> Result<TimeRegisters, RtcError>;
}

/// In-memory clock that behaves like the hardware part: out-of-range fields
/// are dropped without an error, so only a read-back reveals the refusal.
#[derive(Clone, Debug)]
pub struct SimulatedRtc {
    date_time: DateTimeRegisters,
    write_fault: bool,
    date_time_writes: u32,
    time_writes: u32,
}

impl SimulatedRtc {
    /// Starts at 2000-01-01 00:00:00, a Saturday.
    pub const fn new() -> Self {
        Self::with_registers(DateTimeRegisters {
            bytes: [0x00, 0x01, 0x01, 0x06, 0x00, 0x00, 0x00],
        })
    }

    pub const fn with_registers(date_time: DateTimeRegisters) -> Self {
        Self {
            date_time,
            write_fault: false,
            date_time_writes: 0,
            time_writes: 0,
        }
    }

    /// Makes every following write fail on the bus.
    pub fn set_write_fault(&mut self, fault: bool) {
        self.write_fault = fault;
    }

    pub const fn registers(&self) -> DateTimeRegisters {
        self.date_time
    }

    /// Full date/time writes that reached the part, applied or not.
    pub const fn date_time_writes(&self) -> u32 {
        self.date_time_writes
    }

    pub const fn time_writes(&self) -> u32 {
        self.time_writes
    }
}

impl Default for SimulatedRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcRegisters for SimulatedRtc {
    fn write_date_time(&mut self, registers: &DateTimeRegisters) -> Result<(), RtcError> {
        if self.write_fault {
            return Err(RtcError::Bus);
        }
        self.date_time_writes = self.date_time_writes.saturating_add(1);
        let in_range = calendar_from_registers(registers, 0)
            .is_some_and(|time| time.derived_weekday().is_some() && time.time_of_day().is_valid());
        if in_range {
            self.date_time = *registers;
        }
        Ok(())
    }

    fn read_date_time(&mut self) -> Result<DateTimeRegisters, RtcError> {
        Ok(self.date_time)
    }

    fn write_time(&mut self, registers: &TimeRegisters) -> Result<(), RtcError> {
        if self.write_fault {
            return Err(RtcError::Bus);
        }
        self.time_writes = self.time_writes.saturating_add(1);
        if time_from_registers(registers).is_some_and(|time| time.is_valid()) {
            self.date_time.bytes[4..7].copy_from_slice(&registers.bytes);
        }
        Ok(())
    }

    fn read_time(&mut self) -> Result<TimeRegisters, RtcError> {
        let b = &self.date_time.bytes;
        Ok(TimeRegisters {
            bytes: [b[4], b[5], b[6]],
        })
    }
}
