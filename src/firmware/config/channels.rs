use core::cell::Cell;
use core::sync::atomic::AtomicBool;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, raw::RawMutex, Mutex},
    channel::Channel,
};

use super::super::types::{CalendarTime, ClockCommitMessage, TimeOfDayMessage, UiEvent};

pub const UI_EVENT_QUEUE: usize = 8;

/// The only link between the network task and the time authority: one queue
/// per message kind and a shared reply queue carrying the `u32` ack. Every
/// queue holds a single entry, matching the one-outstanding-commit rule.
pub struct ClockCommitChannels<M: RawMutex> {
    pub date_time: Channel<M, ClockCommitMessage, 1>,
    pub time_of_day: Channel<M, TimeOfDayMessage, 1>,
    pub acks: Channel<M, u32, 1>,
}

impl<M: RawMutex> ClockCommitChannels<M> {
    pub const fn new() -> Self {
        Self {
            date_time: Channel::new(),
            time_of_day: Channel::new(),
            acks: Channel::new(),
        }
    }
}

impl<M: RawMutex> Default for ClockCommitChannels<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Last calendar value the time authority confirmed or ticked to. Written
/// only by the authority.
pub struct ClockView<M: RawMutex> {
    current: Mutex<M, Cell<Option<CalendarTime>>>,
}

impl<M: RawMutex> ClockView<M> {
    pub const fn new() -> Self {
        Self {
            current: Mutex::new(Cell::new(None)),
        }
    }

    pub fn get(&self) -> Option<CalendarTime> {
        self.current.lock(|cell| cell.get())
    }

    pub(crate) fn publish(&self, time: Option<CalendarTime>) {
        self.current.lock(|cell| cell.set(time));
    }
}

impl<M: RawMutex> Default for ClockView<M> {
    fn default() -> Self {
        Self::new()
    }
}

pub static COMMIT_CHANNELS: ClockCommitChannels<CriticalSectionRawMutex> =
    ClockCommitChannels::new();
pub static CLOCK_VIEW: ClockView<CriticalSectionRawMutex> = ClockView::new();
pub static UI_EVENTS: Channel<CriticalSectionRawMutex, UiEvent, UI_EVENT_QUEUE> = Channel::new();
pub static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);
