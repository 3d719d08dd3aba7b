//! Integration tests for the full session lifecycle.
//!
//! Drives the state machine against a real (in-memory) SQLite store and
//! checks persistence, cascade deletes, the today aggregation, and the
//! data-reset broadcast end to end.

use std::cell::Cell;
use std::rc::Rc;

use workpulse_core::{
    BreakKind, Database, Event, NullAlert, NullAudio, RecordStore, ResetHub, SessionMachine,
    SessionState, TimerSettings, TodayAggregator,
};

fn machine_over(db: Rc<Database>, settings: TimerSettings) -> SessionMachine {
    SessionMachine::new(
        settings,
        db as Rc<dyn RecordStore>,
        Box::new(NullAlert),
        Box::new(NullAudio),
    )
}

#[test]
fn stop_persists_session_and_updates_today_total() {
    let db = Rc::new(Database::open_memory().unwrap());
    let mut machine = machine_over(Rc::clone(&db), TimerSettings::default());

    machine.start("integration work");
    machine.tick_n(10);
    let ev = machine.stop().unwrap();

    match ev {
        Event::SessionCompleted {
            focus_secs,
            persisted,
            ..
        } => {
            assert_eq!(focus_secs, 10);
            assert!(persisted);
        }
        other => panic!("expected SessionCompleted, got {other:?}"),
    }

    let sessions = db.sessions_desc().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].focus_duration, 10);
    assert!(sessions[0].end_time.is_some());

    assert_eq!(machine.today_total_secs(), 10);

    // The aggregator recomputes the same total from the store alone.
    let mut agg = TodayAggregator::new();
    assert_eq!(agg.refresh(db.as_ref() as &dyn RecordStore).unwrap(), 10);
}

#[test]
fn session_with_breaks_persists_break_events() {
    let db = Rc::new(Database::open_memory().unwrap());
    let mut machine = machine_over(Rc::clone(&db), TimerSettings::default());

    machine.start("long haul");
    machine.tick_n(120);
    machine.start_break(BreakKind::Meal);
    machine.tick_n(45);
    machine.end_break();
    machine.tick_n(60);
    machine.start_break(BreakKind::Toilet);
    machine.tick_n(15);
    machine.stop(); // ends the open break first

    let sessions = db.sessions_desc().unwrap();
    assert_eq!(sessions.len(), 1);
    let session = &sessions[0];
    assert_eq!(session.focus_duration, 180);
    assert_eq!(session.break_duration, 60);
    assert_eq!(session.break_events.len(), 2);
    // Ordered by start time: meal first, then toilet.
    assert_eq!(session.break_events[0].kind, BreakKind::Meal);
    assert_eq!(session.break_events[0].duration, 45);
    assert_eq!(session.break_events[1].kind, BreakKind::Toilet);
    assert_eq!(session.break_events[1].duration, 15);
    assert!(session.break_events.iter().all(|b| b.end_time.is_some()));
}

#[test]
fn multiple_sessions_accumulate_in_today_total() {
    let db = Rc::new(Database::open_memory().unwrap());
    let mut machine = machine_over(Rc::clone(&db), TimerSettings::default());

    for (task, secs) in [("first", 30u64), ("second", 45), ("third", 25)] {
        machine.start(task);
        machine.tick_n(secs);
        machine.stop();
    }

    assert_eq!(machine.today_total_secs(), 100);
    assert_eq!(db.sessions_desc().unwrap().len(), 3);
}

#[test]
fn target_mode_end_to_end_clamps_and_disarms() {
    let db = Rc::new(Database::open_memory().unwrap());
    let mut machine = machine_over(
        Rc::clone(&db),
        TimerSettings {
            target_focus_minutes: 1,
            target_mode_enabled: true,
        },
    );

    machine.start("sprint");
    machine.tick_n(61);
    assert_eq!(machine.state(), SessionState::Paused);
    assert_eq!(machine.focus_secs(), 60);
    assert!(!machine.target_mode_enabled());

    // Resume and keep working past the old target; nothing clamps now.
    machine.resume();
    machine.tick_n(30);
    assert_eq!(machine.focus_secs(), 90);
    machine.stop();

    assert_eq!(db.sessions_desc().unwrap()[0].focus_duration, 90);
}

#[test]
fn reset_broadcast_wipes_store_and_subscribers_refresh() {
    let db = Rc::new(Database::open_memory().unwrap());
    let mut machine = machine_over(Rc::clone(&db), TimerSettings::default());

    machine.start("done");
    machine.tick_n(20);
    machine.stop();
    assert_eq!(machine.today_total_secs(), 20);

    // A second session is in flight when the reset lands.
    machine.start("in flight");
    machine.tick_n(5);

    let mut hub = ResetHub::new();
    let notified = Rc::new(Cell::new(false));
    {
        let notified = Rc::clone(&notified);
        hub.subscribe(move || notified.set(true));
    }

    db.delete_all().unwrap();
    hub.broadcast();
    let ev = machine.handle_data_reset();

    assert!(notified.get());
    assert!(matches!(ev, Event::DataReset { .. }));
    assert_eq!(machine.state(), SessionState::Idle);
    assert_eq!(machine.focus_secs(), 0);
    assert_eq!(machine.today_total_secs(), 0);
    assert!(db.sessions_desc().unwrap().is_empty());
}

#[test]
fn on_disk_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("WORKPULSE_DATA_DIR", dir.path());

    {
        let db = Rc::new(Database::open().unwrap());
        let mut machine = machine_over(Rc::clone(&db), TimerSettings::default());
        machine.start("durable");
        machine.tick_n(12);
        machine.stop();
    }

    let reopened = Database::open().unwrap();
    let sessions = reopened.sessions_desc().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].task_name, "durable");
    assert_eq!(sessions[0].focus_duration, 12);

    std::env::remove_var("WORKPULSE_DATA_DIR");
}
