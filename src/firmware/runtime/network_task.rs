use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex},
    channel::Channel,
};
use embassy_time::{Duration, Instant};
use heapless::Deque;
use log::{debug, info, warn};

use super::super::config::{
    SyncConfig, CLOCK_VIEW, COMMIT_CHANNELS, EXIT_REQUESTED, UI_EVENTS, UI_EVENT_QUEUE,
};
use super::super::orchestrator::{SyncOrchestrator, SyncPlatform};
use super::super::sync_state::{SyncApplyResult, SyncCommand, SyncState};
use super::super::tz_input::{TimezoneInput, TzInputOutcome};
use super::super::types::{SyncAttemptResult, UiEvent};
use super::FrameSync;

/// Network-side task: turns UI events into state commands, runs attempts
/// while the state is `Syncing`, and schedules periodic corrections once
/// synced.
pub struct NetworkTask<'a, P: SyncPlatform, M: RawMutex, const N: usize> {
    orchestrator: SyncOrchestrator<'a, P, M>,
    tz_input: TimezoneInput,
    ui_events: &'a Channel<M, UiEvent, N>,
    deferred: Deque<UiEvent, UI_EVENT_QUEUE>,
    next_resync_at: Option<Instant>,
}

pub type DeviceNetworkTask<P> =
    NetworkTask<'static, P, CriticalSectionRawMutex, UI_EVENT_QUEUE>;

impl<P: SyncPlatform> DeviceNetworkTask<P> {
    /// Task wired to the process-wide commit queues, clock view, UI queue
    /// and exit flag.
    pub fn on_device(platform: P, config: SyncConfig) -> Self {
        let orchestrator = SyncOrchestrator::new(
            platform,
            config,
            &COMMIT_CHANNELS,
            &CLOCK_VIEW,
            &EXIT_REQUESTED,
        );
        Self::new(orchestrator, &UI_EVENTS)
    }
}

impl<'a, P: SyncPlatform, M: RawMutex, const N: usize> NetworkTask<'a, P, M, N> {
    pub fn new(
        orchestrator: SyncOrchestrator<'a, P, M>,
        ui_events: &'a Channel<M, UiEvent, N>,
    ) -> Self {
        Self {
            tz_input: TimezoneInput::from_offset(orchestrator.snapshot().offset),
            orchestrator,
            ui_events,
            deferred: Deque::new(),
            next_resync_at: None,
        }
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator<'a, P, M> {
        &self.orchestrator
    }

    pub fn tz_input(&self) -> &TimezoneInput {
        &self.tz_input
    }

    pub fn next_resync_at(&self) -> Option<Instant> {
        self.next_resync_at
    }

    /// Applies one UI event. Key edits that do not confirm an offset return
    /// `None`.
    pub fn handle_ui_event(&mut self, event: UiEvent) -> Option<SyncApplyResult> {
        let command = match event {
            UiEvent::Timezone(key) => match self.tz_input.apply(key) {
                TzInputOutcome::Editing => return None,
                TzInputOutcome::Confirmed(offset) => SyncCommand::OffsetConfirmed(offset),
            },
            UiEvent::StartSync => SyncCommand::StartSync,
            UiEvent::Resync => SyncCommand::Resync,
            UiEvent::Cancel => {
                self.next_resync_at = None;
                SyncCommand::Cancel
            }
            UiEvent::Exit => {
                self.orchestrator.request_exit();
                SyncCommand::Exit
            }
        };
        let result = self.orchestrator.apply(command);
        debug!(
            "ntpsync: ui_event {:?} status={:?} state={}",
            event,
            result.status,
            result.after.state.label()
        );
        Some(result)
    }

    /// Whether a synced clock is due for its periodic correction at `now`.
    pub fn resync_due(&self, now: Instant) -> bool {
        matches!(self.orchestrator.snapshot().state, SyncState::Synced(_))
            && self.next_resync_at.is_some_and(|at| now >= at)
    }

    /// One pass of the loop. Returns `false` once the task has exited.
    pub async fn step<F: FrameSync>(&mut self, frame: &mut F) -> bool {
        while let Some(event) = self.deferred.pop_front() {
            self.handle_ui_event(event);
        }
        while let Ok(event) = self.ui_events.try_receive() {
            self.handle_ui_event(event);
        }
        if self.orchestrator.exit_requested()
            && self.orchestrator.snapshot().state != SyncState::Exiting
        {
            self.orchestrator.apply(SyncCommand::Exit);
        }

        match self.orchestrator.snapshot().state {
            SyncState::Exiting => return false,
            SyncState::Syncing { .. } => {
                let mut attempt_frame = AttemptFrame {
                    inner: &mut *frame,
                    ui_events: self.ui_events,
                    deferred: &mut self.deferred,
                    cancel: false,
                    exit: false,
                };
                let result = self.orchestrator.run_attempt(&mut attempt_frame).await;
                let (cancel, exit) = (attempt_frame.cancel, attempt_frame.exit);
                if let Some(result) = result {
                    self.schedule_after(result);
                }
                if exit {
                    self.handle_ui_event(UiEvent::Exit);
                } else if cancel
                    && self.orchestrator.snapshot().state != SyncState::AwaitingOffsetInput
                {
                    self.handle_ui_event(UiEvent::Cancel);
                }
                return true;
            }
            SyncState::Synced(_) if self.resync_due(Instant::now()) => {
                info!("ntpsync: periodic_resync");
                self.next_resync_at = None;
                self.orchestrator.apply(SyncCommand::Resync);
                return true;
            }
            _ => {}
        }
        frame.wait_frame().await;
        true
    }

    pub async fn run<F: FrameSync>(&mut self, frame: &mut F) {
        info!(
            "ntpsync: task_started server={}",
            self.orchestrator.config().server
        );
        while self.step(frame).await {}
        info!("ntpsync: task_exited");
    }

    fn schedule_after(&mut self, result: SyncAttemptResult) {
        self.next_resync_at = match result {
            SyncAttemptResult::Success(_) => self
                .orchestrator
                .config()
                .poll_interval_secs()
                .map(|secs| Instant::now() + Duration::from_secs(secs as u64)),
            _ => None,
        };
        if let Some(at) = self.next_resync_at {
            debug!("ntpsync: resync_scheduled at_ms={}", at.as_millis());
        }
    }
}

/// Frame sync for a running attempt. The UI queue is drained at every frame
/// so cancel and exit stop the attempt at the next boundary; other events
/// are held for the next step.
struct AttemptFrame<'f, F, M: RawMutex, const N: usize> {
    inner: &'f mut F,
    ui_events: &'f Channel<M, UiEvent, N>,
    deferred: &'f mut Deque<UiEvent, UI_EVENT_QUEUE>,
    cancel: bool,
    exit: bool,
}

impl<F: FrameSync, M: RawMutex, const N: usize> FrameSync for AttemptFrame<'_, F, M, N> {
    async fn wait_frame(&mut self) {
        self.inner.wait_frame().await;
        while let Ok(event) = self.ui_events.try_receive() {
            match event {
                UiEvent::Exit => self.exit = true,
                UiEvent::Cancel => self.cancel = true,
                other => {
                    if self.deferred.push_back(other).is_err() {
                        warn!("ntpsync: ui_event_dropped event={:?}", other);
                    }
                }
            }
        }
    }

    fn stop_requested(&self) -> bool {
        self.exit || self.cancel || self.inner.stop_requested()
    }
}
