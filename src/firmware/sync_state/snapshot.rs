use super::super::types::{CalendarTime, OffsetSpec, SyncAttemptResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncState {
    AwaitingOffsetInput,
    Syncing { retries_remaining: u8 },
    Synced(CalendarTime),
    Exiting,
}

impl SyncState {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AwaitingOffsetInput => "awaiting_offset_input",
            Self::Syncing { .. } => "syncing",
            Self::Synced(_) => "synced",
            Self::Exiting => "exiting",
        }
    }
}

/// What the UI reads: the state plus the offset in use and the outcome of
/// the last finished attempt.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SyncSnapshot {
    pub state: SyncState,
    pub offset: OffsetSpec,
    pub last_result: Option<SyncAttemptResult>,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            state: SyncState::AwaitingOffsetInput,
            offset: OffsetSpec::UTC,
            last_result: None,
        }
    }
}
