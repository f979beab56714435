use super::super::types::{OffsetSpec, SyncAttemptResult};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncCommand {
    OffsetConfirmed(OffsetSpec),
    StartSync,
    Resync,
    Cancel,
    Exit,
    /// Progress from inside an attempt; never ends it.
    RetryConsumed { retries_remaining: u8 },
    AttemptFinished(SyncAttemptResult),
}
