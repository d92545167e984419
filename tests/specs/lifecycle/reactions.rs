//! Reaction execution on lifecycle transitions.

use crate::prelude::*;
use fleet_core::reaction::keys;
use fleet_core::test_support::pr_session;
use fleet_core::{
    CiSummary, EscalateAfter, EventType, Priority, SessionId, SessionStatus,
};
use fleet_plugins::FakeAgent;

fn ci_failed_config(retries: u32) -> fleet_core::ReactionConfig {
    let mut config = send_to_agent("CI failing");
    config.retries = Some(retries);
    config.escalate_after = Some(EscalateAfter::Count(retries));
    config
}

#[tokio::test]
async fn ci_failure_sends_to_agent_once_per_status_entry() {
    let f = FleetBuilder::new()
        .reaction(keys::CI_FAILED, ci_failed_config(2))
        .build();
    let mut session = pr_session("app-1", "app", 12);
    session.status = SessionStatus::PrOpen;
    f.runtime.add_handle("tmux-app-1");
    f.runtime.set_output("tmux-app-1", "pushed, waiting on checks");
    f.scm.set_ci_summary(CiSummary::Failing);
    f.manager.add_session(session);

    f.poll().await;

    // One send, straight to the agent, no human notification.
    assert_eq!(
        f.manager.sent(),
        vec![(SessionId::new("app-1"), "CI failing".to_string())]
    );
    assert!(f.notifier.events().is_empty());

    // Status is unchanged on later cycles, so the reaction does not
    // re-trigger and the tracker is untouched.
    f.poll().await;
    f.poll().await;
    assert_eq!(f.manager.sent().len(), 1);
    assert!(f.notifier.events().is_empty());
}

#[tokio::test]
async fn tracker_resets_on_status_change_not_on_ticks() {
    let f = FleetBuilder::new()
        .reaction(keys::CI_FAILED, ci_failed_config(2))
        .build();
    let mut session = pr_session("app-1", "app", 12);
    session.status = SessionStatus::PrOpen;
    f.runtime.add_handle("tmux-app-1");
    f.runtime.set_output("tmux-app-1", "pushed");
    f.scm.set_ci_summary(CiSummary::Failing);
    f.manager.add_session(session);

    // Three consecutive entries into ci_failed: each is attempt 1.
    for _ in 0..3 {
        f.poll().await;
        f.scm.set_ci_summary(CiSummary::Passing);
        f.poll().await;
        f.scm.set_ci_summary(CiSummary::Failing);
    }

    assert_eq!(f.manager.sent().len(), 3);
    // Never escalated: attempts reset with each status change.
    assert!(f
        .notifier
        .events()
        .iter()
        .all(|e| e.event_type != EventType::ReactionEscalated));
}

#[tokio::test]
async fn codex_rate_limit_prompt_is_dismissed_in_place() {
    let f = FleetBuilder::new().agent(FakeAgent::named("codex")).build();
    let mut session = active_session(
        &f,
        "app-1",
        "Approaching rate limits\nSwitch to gpt-5.1-codex-mini\nPress enter to confirm",
    );
    session.status = SessionStatus::Working;
    f.agent.set_activity(fleet_core::AgentActivity::WaitingInput);
    f.manager.add_session(session);

    f.poll().await;

    // The keystroke went to the runtime, not the session manager.
    assert_eq!(
        f.runtime.sent(),
        vec![("tmux-app-1".to_string(), "3\n".to_string())]
    );
    // Status stays working; the prompt never surfaces as needs_input.
    assert_eq!(
        f.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::Working)
    );
    assert!(f.notifier.events().is_empty());

    let meta = f.meta("app-1").await;
    assert_eq!(
        meta.get("codex_rate_limit_prompt_autodismiss_choice")
            .map(String::as_str),
        Some("3")
    );
}

#[tokio::test]
async fn needs_input_without_reaction_notifies_urgently() {
    let f = fleet();
    let mut session = active_session(&f, "app-1", "Choose an option: ");
    session.status = SessionStatus::Working;
    f.agent.set_activity(fleet_core::AgentActivity::WaitingInput);
    f.manager.add_session(session);

    f.poll().await;

    assert_eq!(
        f.engine.states().get(&SessionId::new("app-1")),
        Some(&SessionStatus::NeedsInput)
    );
    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::SessionNeedsInput);
    assert_eq!(events[0].priority, Priority::Urgent);
}
