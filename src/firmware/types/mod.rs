mod calendar;
mod commit;
mod offset;
mod sync;
mod ui_event;

pub use calendar::{CalendarTime, TimeOfDay, Weekday, MAX_UTC_OFFSET_MINUTES};
pub use commit::{
    ClockCommitAck, ClockCommitMessage, TimeOfDayMessage, CLOCK_COMMIT_MESSAGE_LEN,
    TIME_OF_DAY_MESSAGE_LEN,
};
pub use offset::{
    OffsetError, OffsetSpec, OFFSET_HOURS_MAX, OFFSET_HOURS_MIN, OFFSET_MINUTES_MAX,
    POSIX_TZ_MAX,
};
pub use sync::{
    LeapSecondInfo, NetworkTimestamp, ProtocolErrorCode, ServerDescriptor, SyncAttemptResult,
    TransportError, TransportErrorKind, SERVER_NAME_MAX,
};
pub use ui_event::{TzKey, UiEvent};
