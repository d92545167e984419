//! Lifecycle classification through full poll cycles.

use crate::prelude::*;
use fleet_core::test_support::live_session;
use fleet_core::{SessionId, SessionStatus};

#[tokio::test]
async fn spawning_session_becomes_working_with_no_reaction() {
    let f = fleet();
    let mut session = active_session(&f, "app-1", "cargo check running");
    session.status = SessionStatus::Spawning;
    f.manager.add_session(session);

    f.poll().await;

    assert_eq!(
        f.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Working)
    );
    let meta = f.meta("app-1").await;
    assert_eq!(meta.get("status").map(String::as_str), Some("working"));
    assert!(f.notifier.events().is_empty());
    assert!(f.manager.sent().is_empty());
}

#[tokio::test]
async fn empty_fleet_cycles_quietly() {
    let f = fleet();
    f.poll().await;
    f.poll().await;
    assert!(f.engine.states().is_empty());
    assert!(f.notifier.events().is_empty());
    assert!(f.tracker.calls().is_empty());
}

#[tokio::test]
async fn probe_failure_keeps_a_stuck_session_stuck() {
    let f = fleet();
    let mut session = live_session("app-1", "app");
    session.status = SessionStatus::Stuck;
    f.runtime.add_handle("tmux-app-1");
    f.runtime.fail_output("tmux-app-1");
    f.manager.add_session(session);

    f.poll().await;

    assert_eq!(
        f.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Stuck)
    );
}

#[tokio::test]
async fn dead_runtime_kills_the_session_and_alerts() {
    let f = fleet();
    let mut session = live_session("app-1", "app");
    session.status = SessionStatus::Working;
    f.runtime.set_alive("tmux-app-1", false);
    f.manager.add_session(session);

    f.poll().await;

    assert_eq!(
        f.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Killed)
    );
    // session.killed is urgent and unhandled without a reaction.
    let killed: Vec<_> = f
        .notifier
        .events()
        .into_iter()
        .filter(|e| e.event_type == fleet_core::EventType::SessionKilled)
        .collect();
    assert_eq!(killed.len(), 1);
    assert_eq!(killed[0].priority, fleet_core::Priority::Urgent);
}

#[tokio::test]
async fn disappearing_sessions_are_forgotten() {
    let f = fleet();
    let session = active_session(&f, "app-1", "building");
    f.manager.add_session(session);

    f.poll().await;
    assert_eq!(f.engine.states().len(), 1);

    f.manager.remove_session(&SessionId::new("app-1"));
    f.poll().await;
    assert!(f.engine.states().is_empty());
}
