use core::sync::atomic::AtomicBool;

use embassy_futures::block_on;
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, channel::Channel};
use embassy_time::{Duration, Instant};

use super::*;
use crate::firmware::commit::{ClockCommitter, SimulatedRtc, TimeAuthority};
use crate::firmware::config::{ClockCommitChannels, ClockView, SyncConfig};
use crate::firmware::orchestrator::SyncOrchestrator;
use crate::firmware::sync_state::{SyncApplyStatus, SyncState};
use crate::firmware::testing::{CountingFrame, FakePlatform, ReceiveStep, ScriptedEngine};
use crate::firmware::time_convert::to_network_timestamp;
use crate::firmware::types::{CalendarTime, ClockCommitAck, SyncAttemptResult, TzKey, UiEvent};

type Events = Channel<NoopRawMutex, UiEvent, 4>;

/// Queues UI events while the first frame is pending, as a UI task would
/// mid-attempt.
struct UiFrame<'a> {
    events: &'a Events,
    on_first: &'a [UiEvent],
    frames: u32,
}

impl<'a> UiFrame<'a> {
    fn new(events: &'a Events, on_first: &'a [UiEvent]) -> Self {
        Self {
            events,
            on_first,
            frames: 0,
        }
    }
}

impl FrameSync for UiFrame<'_> {
    async fn wait_frame(&mut self) {
        if self.frames == 0 {
            for event in self.on_first {
                self.events.try_send(*event).unwrap();
            }
        }
        self.frames += 1;
    }
}

fn slow_config() -> SyncConfig {
    SyncConfig {
        max_retries: 5,
        max_receive_polls: 100,
        ..config()
    }
}

fn config() -> SyncConfig {
    SyncConfig {
        max_retries: 2,
        max_receive_polls: 2,
        ack_timeout_ms: 200,
        ..SyncConfig::default()
    }
}

#[test]
fn confirmed_timezone_starts_syncing() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);

    assert!(task.handle_ui_event(UiEvent::Timezone(TzKey::Up)).is_none());
    assert!(task.handle_ui_event(UiEvent::Timezone(TzKey::Right)).is_none());
    assert!(task.handle_ui_event(UiEvent::Timezone(TzKey::Up)).is_none());
    let applied = task
        .handle_ui_event(UiEvent::Timezone(TzKey::Confirm))
        .unwrap();
    assert_eq!(applied.status, SyncApplyStatus::Applied);

    let snapshot = task.orchestrator().snapshot();
    assert_eq!(snapshot.offset.utc_offset_minutes(), 75);
    assert_eq!(
        snapshot.state,
        SyncState::Syncing {
            retries_remaining: 2
        }
    );
}

#[test]
fn exit_event_raises_flag_and_stops_the_loop() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    events.try_send(UiEvent::Exit).unwrap();

    let mut frame = CountingFrame::new();
    assert!(!block_on(task.step(&mut frame)));
    assert!(exit.load(core::sync::atomic::Ordering::Relaxed));
    assert_eq!(task.orchestrator().snapshot().state, SyncState::Exiting);
    block_on(task.run(&mut frame));
    assert_eq!(frame.frames, 0);
}

#[test]
fn exit_event_stops_a_running_attempt_at_the_next_frame() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        slow_config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    task.handle_ui_event(UiEvent::StartSync);

    let mut frame = UiFrame::new(&events, &[UiEvent::Exit]);
    assert!(block_on(task.step(&mut frame)));
    assert_eq!(frame.frames, 1);
    let snapshot = task.orchestrator().snapshot();
    assert_eq!(snapshot.state, SyncState::Exiting);
    assert_eq!(snapshot.last_result, Some(SyncAttemptResult::Cancelled));
    assert!(exit.load(core::sync::atomic::Ordering::Relaxed));
    assert!(!block_on(task.step(&mut frame)));
}

#[test]
fn cancel_event_ends_attempt_and_keeps_other_input() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        slow_config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    task.handle_ui_event(UiEvent::StartSync);

    let queued = [UiEvent::Timezone(TzKey::Up), UiEvent::Cancel];
    let mut frame = UiFrame::new(&events, &queued);
    assert!(block_on(task.step(&mut frame)));
    assert_eq!(frame.frames, 1);
    let snapshot = task.orchestrator().snapshot();
    assert_eq!(snapshot.state, SyncState::AwaitingOffsetInput);
    assert_eq!(snapshot.last_result, Some(SyncAttemptResult::Cancelled));
    assert!(!exit.load(core::sync::atomic::Ordering::Relaxed));
    assert_eq!(task.tz_input().hours(), 0);

    assert!(block_on(task.step(&mut frame)));
    assert_eq!(task.tz_input().hours(), 1);
}

#[test]
fn external_exit_flag_is_honoured() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(true);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    assert!(!block_on(task.step(&mut CountingFrame::new())));
}

#[test]
fn idle_step_waits_one_frame() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    let mut frame = CountingFrame::new();
    assert!(block_on(task.step(&mut frame)));
    assert_eq!(frame.frames, 1);
}

#[test]
fn synced_attempt_schedules_periodic_correction() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let script =
        ScriptedEngine::new().receive(ReceiveStep::Respond(to_network_timestamp(1_718_452_800)));
    let orchestrator =
        SyncOrchestrator::new(FakePlatform::new(script), config(), &channels, &view, &exit);
    let mut task = NetworkTask::new(orchestrator, &events);
    events.try_send(UiEvent::StartSync).unwrap();

    let mut frame = CountingFrame::new();
    let stepped = block_on(select(task.step(&mut frame), run_time_authority(&mut authority)));
    assert!(matches!(stepped, Either::First(true)));

    let SyncState::Synced(time) = task.orchestrator().snapshot().state else {
        panic!("expected synced state");
    };
    assert_eq!((time.year, time.month, time.day, time.hour), (2024, 6, 15, 12));
    let at = task.next_resync_at().unwrap();
    assert!(!task.resync_due(Instant::now()));
    assert!(task.resync_due(at + Duration::from_secs(1)));
}

#[test]
fn failed_attempt_returns_to_offset_input_without_schedule() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let exit = AtomicBool::new(false);
    let events = Events::new();
    let orchestrator = SyncOrchestrator::new(
        FakePlatform::new(ScriptedEngine::new()),
        config(),
        &channels,
        &view,
        &exit,
    );
    let mut task = NetworkTask::new(orchestrator, &events);
    task.handle_ui_event(UiEvent::StartSync);

    assert!(block_on(task.step(&mut CountingFrame::new())));
    let snapshot = task.orchestrator().snapshot();
    assert_eq!(snapshot.state, SyncState::AwaitingOffsetInput);
    assert_eq!(snapshot.last_result, Some(SyncAttemptResult::Timeout));
    assert_eq!(task.next_resync_at(), None);
}

#[test]
fn authority_task_serves_commits() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let mut committer = ClockCommitter::new(&channels, 500);
    let time = CalendarTime::from_fields(2030, 2, 28, 6, 15, 0, -300).unwrap();

    let served = block_on(select(committer.commit(&time), run_time_authority(&mut authority)));
    let Either::First(ack) = served else {
        panic!("authority loop returned");
    };
    assert_eq!(ack, Ok(ClockCommitAck::ACCEPTED));
    assert_eq!(view.get(), Some(time));
}

#[test]
fn ticker_frame_sync_paces_frames() {
    let mut frame = TickerFrameSync::new(5);
    let started = Instant::now();
    block_on(async {
        frame.wait_frame().await;
        frame.wait_frame().await;
    });
    assert!(started.elapsed() >= Duration::from_millis(5));
}

#[test]
fn device_task_uses_shared_queues() {
    let task = DeviceNetworkTask::on_device(FakePlatform::new(ScriptedEngine::new()), config());
    assert_eq!(
        task.orchestrator().snapshot().state,
        SyncState::AwaitingOffsetInput
    );
    assert_eq!(task.orchestrator().config().max_retries, 2);
    assert_eq!(task.tz_input().hours(), 0);
}
