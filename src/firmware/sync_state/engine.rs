use log::debug;
use statig::blocking::IntoStateMachineExt as _;

use super::events::SyncCommand;
use super::machine::{DispatchContext, SyncStateMachine};
use super::snapshot::SyncSnapshot;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncApplyStatus {
    Applied,
    Unchanged,
    InvalidTransition,
}

#[derive(Clone, Copy, Debug)]
pub struct SyncApplyResult {
    pub before: SyncSnapshot,
    pub after: SyncSnapshot,
    pub status: SyncApplyStatus,
}

impl SyncApplyResult {
    pub fn changed(self) -> bool {
        matches!(self.status, SyncApplyStatus::Applied)
    }

    pub fn state_changed(self) -> bool {
        core::mem::discriminant(&self.before.state) != core::mem::discriminant(&self.after.state)
    }
}

/// Owner of the synchronization state. The UI only reads snapshots and feeds
/// commands through [`SyncStateEngine::apply`].
pub struct SyncStateEngine {
    machine: statig::blocking::StateMachine<SyncStateMachine>,
}

impl SyncStateEngine {
    pub fn new(max_retries: u8) -> Self {
        Self {
            machine: SyncStateMachine::new(max_retries).state_machine(),
        }
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.machine.inner().snapshot
    }

    pub fn apply(&mut self, command: SyncCommand) -> SyncApplyResult {
        let before = self.snapshot();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&command, &mut context);
        let after = self.snapshot();
        if before.state.label() != after.state.label() {
            debug!(
                "ntpsync: state from={} to={}",
                before.state.label(),
                after.state.label()
            );
        }
        SyncApplyResult {
            before,
            after,
            status: context.status,
        }
    }
}
