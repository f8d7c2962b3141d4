//! End-to-end attempts driven through the dispatcher

use nyacore_timer::server::codec;
use nyacore_timer::{
    Action, ControlEvent, Dispatcher, Notification, Run, RunEvent, RunState, Segment, TimeKind,
    TimeValue,
};

fn abc() -> Dispatcher {
    Dispatcher::new(Run::with_segments(
        "Any%",
        vec![Segment::new("A"), Segment::new("B"), Segment::new("C")],
    ))
}

fn send(dispatcher: &Dispatcher, action: Action, timestamp: i64) {
    dispatcher.dispatch(ControlEvent::manual(action, timestamp));
}

fn times(dispatcher: &Dispatcher, kind: TimeKind) -> Vec<Option<i64>> {
    dispatcher.with_run(|run| (0..run.len()).map(|i| run.time(i, kind).nanos()).collect())
}

#[test]
fn test_first_attempt_becomes_personal_best() {
    let d = abc();
    let rx = d.subscribe();

    send(&d, Action::Start, 0);
    send(&d, Action::Split, 100);
    send(&d, Action::Split, 250);
    send(&d, Action::Split, 400);

    assert_eq!(d.state(), RunState::Stopped);
    assert_eq!(times(&d, TimeKind::Live), vec![Some(100), Some(250), Some(400)]);
    assert_eq!(times(&d, TimeKind::Comparison), vec![Some(100), Some(250), Some(400)]);
    assert_eq!(times(&d, TimeKind::Best), vec![Some(100), Some(150), Some(150)]);

    let personal_bests: Vec<_> = rx
        .try_iter()
        .filter_map(|n| match n {
            Notification::Run(RunEvent::PersonalBest { total }) => Some(total),
            _ => None,
        })
        .collect();
    assert_eq!(personal_bests, vec![TimeValue::from_nanos(400)]);
}

#[test]
fn test_slower_attempt_keeps_comparison_but_updates_gold() {
    let d = abc();
    for (action, ts) in [
        (Action::Start, 0),
        (Action::Split, 100),
        (Action::Split, 250),
        (Action::Split, 400),
        (Action::Reset, 0),
    ] {
        send(&d, action, ts);
    }

    send(&d, Action::Start, 1000);
    send(&d, Action::Split, 1080);
    send(&d, Action::Split, 1260);

    assert!(d.with_run(|run| run.is_best_segment(0)));
    assert!(!d.with_run(|run| run.is_best_segment(1)));

    send(&d, Action::Split, 1500);

    assert_eq!(d.state(), RunState::Stopped);
    assert_eq!(times(&d, TimeKind::Comparison), vec![Some(100), Some(250), Some(400)]);
    assert_eq!(times(&d, TimeKind::Best), vec![Some(80), Some(150), Some(150)]);
    assert_eq!(d.with_run(|run| run.total(TimeKind::Delta)), TimeValue::from_nanos(100));

    let snapshot = d.snapshot();
    assert_eq!(snapshot.attempts, 2);
    assert_eq!(snapshot.completed, 2);
    assert_eq!(snapshot.best_total, TimeValue::from_nanos(380));
}

#[test]
fn test_pause_excludes_frozen_interval() {
    let d = Dispatcher::new(Run::with_segments("single", vec![Segment::new("Only")]));

    send(&d, Action::Start, 0);
    send(&d, Action::Pause, 100);
    send(&d, Action::Resume, 300);
    send(&d, Action::Split, 400);

    assert_eq!(d.with_run(|run| run.live_time(0)), TimeValue::from_nanos(200));
    assert_eq!(d.state(), RunState::Stopped);
}

#[test]
fn test_reset_from_every_state() {
    let prefixes: Vec<Vec<(Action, i64)>> = vec![
        vec![],
        vec![(Action::Start, 0), (Action::Split, 10)],
        vec![(Action::Start, 0), (Action::Pause, 10)],
        vec![(Action::Start, 0), (Action::Split, 10), (Action::End, 0)],
    ];

    for prefix in prefixes {
        let d = abc();
        d.edit(|run| run.set_comparison_time(2, TimeValue::from_nanos(999)))
            .unwrap();
        for (action, ts) in &prefix {
            send(&d, *action, *ts);
        }

        send(&d, Action::Reset, 0);

        let snapshot = d.snapshot();
        assert_eq!(snapshot.state, RunState::Ready);
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.previous_index, None);
        assert!(snapshot.segments.iter().all(|s| s.live.is_unknown()));
        assert_eq!(snapshot.segments[2].comparison, TimeValue::from_nanos(999));
    }
}

#[test]
fn test_unsplit() {
    let d = abc();

    send(&d, Action::Unsplit, 0);
    assert_eq!(d.with_run(Run::current_index), 0);
    assert_eq!(d.state(), RunState::Ready);

    send(&d, Action::Start, 0);
    send(&d, Action::Split, 100);
    send(&d, Action::Unsplit, 0);

    assert_eq!(d.with_run(Run::current_index), 0);
    assert!(d.with_run(|run| run.live_time(0).is_unknown()));
    assert!(d.with_run(|run| run.segment(0).unwrap().best_duration.is_unknown()));
}

#[test]
fn test_protocol_lines_drive_a_run() {
    let d = abc();

    for line in ["1:0", "", "garbage", "3:100", "6:150", "7:200", "3:300", "2:999", "\u{0}3:450"] {
        d.dispatch(codec::decode(line).event);
    }

    assert_eq!(d.state(), RunState::Stopped);
    assert_eq!(times(&d, TimeKind::Live), vec![Some(100), Some(250), Some(400)]);

    d.dispatch(codec::decode("5:12345").event);
    assert_eq!(d.state(), RunState::Ready);
}
