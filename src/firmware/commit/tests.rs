use embassy_futures::{block_on, join::join};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Timer;

use super::*;
use crate::firmware::config::ClockView;
use crate::firmware::time_convert::date_time_registers;

fn new_year_eve() -> CalendarTime {
    CalendarTime::from_fields(2024, 12, 31, 23, 59, 58, 60).unwrap()
}

#[test]
fn valid_commit_is_written_and_confirmed() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);

    let time = new_year_eve();
    let ack = authority.handle_date_time(ClockCommitMessage::encode(&time));
    assert_eq!(ack, ClockCommitAck::ACCEPTED);
    assert_eq!(
        authority.rtc().registers(),
        date_time_registers(&time).unwrap()
    );
    assert_eq!(authority.cached(), Some(time));
    assert_eq!(view.get(), Some(time));
}

#[test]
fn month_thirteen_is_refused_by_readback() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let before = authority.rtc().registers();

    let mut time = new_year_eve();
    time.month = 13;
    let ack = authority.handle_date_time(ClockCommitMessage::encode(&time));
    assert_eq!(ack, ClockCommitAck::REJECTED);
    assert_eq!(authority.rtc().date_time_writes(), 1);
    assert_eq!(authority.rtc().registers(), before);
}

#[test]
fn bus_fault_rejects_commit() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut rtc = SimulatedRtc::new();
    rtc.set_write_fault(true);
    let mut authority = TimeAuthority::new(rtc, &channels, &view);

    let ack = authority.handle_date_time(ClockCommitMessage::encode(&new_year_eve()));
    assert_eq!(ack, ClockCommitAck::REJECTED);
    let ack = authority.handle_time_of_day(TimeOfDayMessage::encode(TimeOfDay {
        hour: 1,
        minute: 2,
        second: 3,
    }));
    assert_eq!(ack, ClockCommitAck::REJECTED);
}

#[test]
fn time_of_day_commit_keeps_the_date() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let time = new_year_eve();
    authority.handle_date_time(ClockCommitMessage::encode(&time));

    let tod = TimeOfDay {
        hour: 7,
        minute: 30,
        second: 0,
    };
    assert_eq!(
        authority.handle_time_of_day(TimeOfDayMessage::encode(tod)),
        ClockCommitAck::ACCEPTED
    );
    let cached = authority.cached().unwrap();
    assert!(cached.same_date(&time));
    assert_eq!(cached.time_of_day(), tod);
    assert_eq!(cached.utc_offset_minutes, 60);

    let bad = TimeOfDay {
        hour: 24,
        minute: 0,
        second: 0,
    };
    assert_eq!(
        authority.handle_time_of_day(TimeOfDayMessage::encode(bad)),
        ClockCommitAck::REJECTED
    );
    assert_eq!(authority.cached().unwrap().time_of_day(), tod);
}

#[test]
fn second_tick_rolls_cached_view_over_midnight() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    authority.handle_date_time(ClockCommitMessage::encode(&new_year_eve()));
    let registers = authority.rtc().registers();

    authority.on_second_tick();
    authority.on_second_tick();
    let cached = view.get().unwrap();
    assert_eq!((cached.year, cached.month, cached.day), (2025, 1, 1));
    assert_eq!(cached.time_of_day().hour, 0);
    assert_eq!(cached.weekday, crate::firmware::types::Weekday::Wednesday);
    assert_eq!(authority.rtc().registers(), registers);
}

#[test]
fn committer_round_trip_through_channels() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let mut committer = ClockCommitter::new(&channels, 1_000);
    let time = new_year_eve();

    let (ack, served) = block_on(join(committer.commit(&time), async {
        let message = next_message(&channels).await;
        authority.handle(message)
    }));
    assert_eq!(ack, Ok(ClockCommitAck::ACCEPTED));
    assert_eq!(served, ClockCommitAck::ACCEPTED);
    assert_eq!(view.get(), Some(time));
}

#[test]
fn stale_ack_does_not_answer_a_new_commit() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let mut committer = ClockCommitter::new(&channels, 1_000);
    channels.acks.try_send(ClockCommitAck::ACCEPTED.0).unwrap();

    let mut time = new_year_eve();
    time.month = 13;
    let (ack, _) = block_on(join(committer.commit(&time), async {
        let message = next_message(&channels).await;
        authority.handle(message)
    }));
    assert_eq!(ack, Ok(ClockCommitAck::REJECTED));
}

#[test]
fn missing_authority_times_out() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let mut committer = ClockCommitter::new(&channels, 20);
    let ack = block_on(committer.commit(&new_year_eve()));
    assert_eq!(ack, Err(CommitError::AckTimeout));
    assert_eq!(
        CommitError::AckTimeout.protocol_error(),
        ProtocolErrorCode::AckTimeout
    );
    assert_eq!(
        CommitError::EnqueueTimeout.protocol_error(),
        ProtocolErrorCode::EnqueueTimeout
    );
}

#[test]
fn timed_out_request_is_withdrawn_before_the_next_commit() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let mut committer = ClockCommitter::new(&channels, 20);

    let mut bad = new_year_eve();
    bad.month = 13;
    assert_eq!(block_on(committer.commit(&bad)), Err(CommitError::AckTimeout));
    assert!(channels.date_time.try_receive().is_err());
    assert!(!committer.awaiting_late_ack());

    let time = new_year_eve();
    let (ack, served) = block_on(join(committer.commit(&time), async {
        let message = next_message(&channels).await;
        authority.handle(message)
    }));
    assert_eq!(ack, Ok(ClockCommitAck::ACCEPTED));
    assert_eq!(served, ClockCommitAck::ACCEPTED);
    assert_eq!(authority.rtc().date_time_writes(), 1);
}

#[test]
fn late_ack_for_a_taken_request_is_discarded() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    let mut committer = ClockCommitter::new(&channels, 50);

    let mut bad = new_year_eve();
    bad.month = 13;
    let (ack, _taken) = block_on(join(
        committer.commit(&bad),
        channels.date_time.receive(),
    ));
    assert_eq!(ack, Err(CommitError::AckTimeout));
    assert!(committer.awaiting_late_ack());

    let time = new_year_eve();
    let (ack, _) = block_on(join(committer.commit(&time), async {
        Timer::after_millis(5).await;
        channels.acks.try_send(ClockCommitAck::REJECTED.0).unwrap();
        let message = next_message(&channels).await;
        authority.handle(message)
    }));
    assert_eq!(ack, Ok(ClockCommitAck::ACCEPTED));
    assert!(!committer.awaiting_late_ack());
}

#[test]
fn weekday_contradicting_the_date_is_rejected_unwritten() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);

    let mut time = new_year_eve();
    time.weekday = crate::firmware::types::Weekday::Friday;
    let ack = authority.handle_date_time(ClockCommitMessage::encode(&time));
    assert_eq!(ack, ClockCommitAck::REJECTED);
    assert_eq!(authority.rtc().date_time_writes(), 0);
}

#[test]
fn process_pending_serves_queued_requests() {
    let channels = ClockCommitChannels::<NoopRawMutex>::new();
    let view = ClockView::<NoopRawMutex>::new();
    let mut authority = TimeAuthority::new(SimulatedRtc::new(), &channels, &view);
    assert_eq!(authority.process_pending(), 0);

    channels
        .date_time
        .try_send(ClockCommitMessage::encode(&new_year_eve()))
        .unwrap();
    assert_eq!(authority.process_pending(), 1);
    assert_eq!(channels.acks.try_receive(), Ok(ClockCommitAck::ACCEPTED.0));
}
