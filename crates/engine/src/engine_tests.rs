// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{harness, send_to_agent, HarnessBuilder};
use fleet_core::reaction::keys;
use fleet_core::test_support::{live_session, pr_session};
use fleet_core::{CiSummary, SessionId, SessionStatus};

#[tokio::test]
async fn empty_session_list_is_a_quiet_cycle() {
    let h = harness();
    h.engine.poll_all().await;
    assert!(h.engine.states().is_empty());
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn cycle_classifies_and_records_each_session() {
    let h = harness();
    let session = live_session("app-1", "app");
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "building");
    h.manager.add_session(session);

    h.engine.poll_all().await;
    assert_eq!(
        h.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Working)
    );
    // spawning → working is informational: status persisted, no event.
    let meta = h.meta("app-1").await;
    assert_eq!(meta.get("status").map(String::as_str), Some("working"));
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn ci_failure_sends_once_and_resets_on_status_change() {
    let h = HarnessBuilder::new()
        .reaction(keys::CI_FAILED, {
            let mut c = send_to_agent(Some("CI failing"));
            c.retries = Some(2);
            c
        })
        .build();
    let mut session = pr_session("app-1", "app", 12);
    session.status = SessionStatus::PrOpen;
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "waiting");
    h.scm.set_ci_summary(CiSummary::Failing);
    h.manager.add_session(session);

    // First cycle: pr_open → ci_failed, one send, no notifier call.
    h.engine.poll_all().await;
    assert_eq!(h.manager.sent(), vec![(SessionId::new("app-1"), "CI failing".to_string())]);
    assert!(h.notifier.events().is_empty());

    // Further cycles without a status change re-trigger nothing.
    h.engine.poll_all().await;
    h.engine.poll_all().await;
    assert_eq!(h.manager.sent().len(), 1);

    // Recovery and relapse restart the attempt accounting.
    h.scm.set_ci_summary(CiSummary::Passing);
    h.engine.poll_all().await;
    assert_eq!(
        h.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::PrOpen)
    );
    h.scm.set_ci_summary(CiSummary::Failing);
    h.engine.poll_all().await;
    assert_eq!(h.manager.sent().len(), 2);
}

#[tokio::test]
async fn tick_is_dropped_while_cycle_in_flight() {
    let h = harness();
    let session = live_session("app-1", "app");
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "building");
    h.manager.add_session(session);

    // Simulate an in-flight cycle holding the guard.
    h.engine.polling.store(true, Ordering::SeqCst);
    h.engine.poll_all().await;
    assert!(h.engine.states().is_empty());

    h.engine.polling.store(false, Ordering::SeqCst);
    h.engine.poll_all().await;
    assert!(!h.engine.states().is_empty());
}

#[tokio::test]
async fn stale_sessions_are_pruned_after_the_cycle() {
    let h = harness();
    let session = live_session("app-1", "app");
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "building");
    h.manager.add_session(session);

    h.engine.poll_all().await;
    assert!(h.engine.states().contains_key(&SessionId::new("app-1")));

    h.manager.remove_session(&SessionId::new("app-1"));
    h.engine.poll_all().await;
    assert!(h.engine.states().is_empty());
}

#[tokio::test]
async fn check_polls_one_session_without_the_guard() {
    let h = harness();
    let session = live_session("app-1", "app");
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "building");
    h.manager.add_session(session);

    h.engine.check(&SessionId::new("app-1")).await.unwrap();
    assert_eq!(
        h.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Working)
    );
}

#[tokio::test]
async fn check_unknown_session_is_an_error() {
    let h = harness();
    let err = h.engine.check(&SessionId::new("nope")).await.unwrap_err();
    assert!(matches!(err, crate::EngineError::SessionNotFound(_)));
}

#[tokio::test]
async fn all_complete_emits_once_per_edge() {
    let h = harness();
    let mut session = live_session("app-1", "app");
    session.status = SessionStatus::Merged;
    session.runtime_handle = None;
    h.manager.add_session(session);

    h.engine.poll_all().await;
    let summaries: Vec<_> = h
        .notifier
        .events()
        .into_iter()
        .filter(|e| e.event_type == fleet_core::EventType::AllSessionsComplete)
        .collect();
    assert_eq!(summaries.len(), 1);

    // Steady state: no repeat while everything stays terminal.
    h.engine.poll_all().await;
    let summaries: Vec<_> = h
        .notifier
        .events()
        .into_iter()
        .filter(|e| e.event_type == fleet_core::EventType::AllSessionsComplete)
        .collect();
    assert_eq!(summaries.len(), 1);
}

#[tokio::test]
async fn start_and_stop_drain_cleanly() {
    let h = HarnessBuilder::new()
        .config(|c| c.interval_ms = 10)
        .build();
    let session = live_session("app-1", "app");
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "building");
    h.manager.add_session(session);

    h.engine.start();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    h.engine.stop().await;

    assert_eq!(
        h.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Working)
    );

    // Stopped: no further cycles mutate state.
    h.manager.remove_session(&SessionId::new("app-1"));
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    assert!(h.engine.states().contains_key(&SessionId::new("app-1")));
}

#[tokio::test]
async fn merged_pr_transitions_and_fires_completion_reaction_key() {
    let h = harness();
    let mut session = pr_session("app-1", "app", 12);
    session.status = SessionStatus::Mergeable;
    h.runtime.add_handle("tmux-app-1");
    h.runtime.set_output("tmux-app-1", "done");
    h.scm.set_pr_state(fleet_core::PrState::Merged);
    h.manager.add_session(session);

    h.engine.poll_all().await;
    assert_eq!(
        h.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Merged)
    );
    // merge.completed is action priority and unhandled here.
    let events = h.notifier.events();
    assert!(events
        .iter()
        .any(|e| e.event_type == fleet_core::EventType::MergeCompleted));
}
