mod engine;
mod events;
mod machine;
mod snapshot;

pub use engine::{SyncApplyResult, SyncApplyStatus, SyncStateEngine};
pub use events::SyncCommand;
pub use snapshot::{SyncSnapshot, SyncState};
