use statig::prelude::*;

use super::engine::SyncApplyStatus;
use super::events::SyncCommand;
use super::snapshot::{SyncSnapshot, SyncState};
use super::super::types::SyncAttemptResult;

#[derive(Clone, Copy, Debug)]
pub(super) struct SyncStateMachine {
    pub(super) snapshot: SyncSnapshot,
    pub(super) max_retries: u8,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) status: SyncApplyStatus,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: SyncApplyStatus::Unchanged,
        }
    }
}

impl SyncStateMachine {
    pub(super) fn new(max_retries: u8) -> Self {
        Self {
            snapshot: SyncSnapshot::default(),
            max_retries,
        }
    }

    fn enter_syncing(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        self.snapshot.state = SyncState::Syncing {
            retries_remaining: self.max_retries,
        };
        context.status = SyncApplyStatus::Applied;
        Transition(State::syncing())
    }

    fn enter_awaiting(
        &mut self,
        context: &mut DispatchContext,
        note: SyncAttemptResult,
    ) -> Outcome<State> {
        self.snapshot.state = SyncState::AwaitingOffsetInput;
        self.snapshot.last_result = Some(note);
        context.status = SyncApplyStatus::Applied;
        Transition(State::awaiting_offset_input())
    }

    fn enter_exiting(&mut self, context: &mut DispatchContext) -> Outcome<State> {
        self.snapshot.state = SyncState::Exiting;
        context.status = SyncApplyStatus::Applied;
        Transition(State::exiting())
    }
}

#[state_machine(initial = "State::awaiting_offset_input()")]
impl SyncStateMachine {
    #[state]
    fn awaiting_offset_input(
        &mut self,
        context: &mut DispatchContext,
        event: &SyncCommand,
    ) -> Outcome<State> {
        match event {
            SyncCommand::OffsetConfirmed(offset) => {
                self.snapshot.offset = *offset;
                self.enter_syncing(context)
            }
            SyncCommand::StartSync => self.enter_syncing(context),
            SyncCommand::Exit => self.enter_exiting(context),
            _ => {
                context.status = SyncApplyStatus::InvalidTransition;
                Handled
            }
        }
    }

    #[state]
    fn syncing(&mut self, context: &mut DispatchContext, event: &SyncCommand) -> Outcome<State> {
        match event {
            SyncCommand::RetryConsumed { retries_remaining } => {
                let next = SyncState::Syncing {
                    retries_remaining: *retries_remaining,
                };
                context.status = if self.snapshot.state == next {
                    SyncApplyStatus::Unchanged
                } else {
                    SyncApplyStatus::Applied
                };
                self.snapshot.state = next;
                Handled
            }
            SyncCommand::AttemptFinished(SyncAttemptResult::Success(time)) => {
                self.snapshot.state = SyncState::Synced(*time);
                self.snapshot.last_result = Some(SyncAttemptResult::Success(*time));
                context.status = SyncApplyStatus::Applied;
                Transition(State::synced())
            }
            SyncCommand::AttemptFinished(result) => self.enter_awaiting(context, *result),
            SyncCommand::Cancel => self.enter_awaiting(context, SyncAttemptResult::Cancelled),
            SyncCommand::Exit => self.enter_exiting(context),
            _ => {
                context.status = SyncApplyStatus::InvalidTransition;
                Handled
            }
        }
    }

    #[state]
    fn synced(&mut self, context: &mut DispatchContext, event: &SyncCommand) -> Outcome<State> {
        match event {
            SyncCommand::Resync => self.enter_syncing(context),
            SyncCommand::Cancel => {
                self.snapshot.state = SyncState::AwaitingOffsetInput;
                context.status = SyncApplyStatus::Applied;
                Transition(State::awaiting_offset_input())
            }
            SyncCommand::Exit => self.enter_exiting(context),
            _ => {
                context.status = SyncApplyStatus::InvalidTransition;
                Handled
            }
        }
    }

    #[state]
    fn exiting(&mut self, context: &mut DispatchContext, event: &SyncCommand) -> Outcome<State> {
        context.status = if matches!(event, SyncCommand::Exit) {
            SyncApplyStatus::Unchanged
        } else {
            SyncApplyStatus::InvalidTransition
        };
        Handled
    }
}
