//! Merge gate behavior through the approved-and-green reaction.

use crate::prelude::*;
use fleet_core::reaction::keys;
use fleet_core::session::meta;
use fleet_core::test_support::pr_session;
use fleet_core::{
    CheckStatus, CiCheck, CiSummary, EventType, Mergeability, MergeMethod, Priority,
    ReactionAction, ReactionConfig, ReviewDecision, SessionStatus,
};

fn mergeable_setup(f: &Fleet) {
    f.scm.set_ci_summary(CiSummary::Passing);
    f.scm.set_review_decision(ReviewDecision::Approved);
    f.scm.set_mergeability(Mergeability {
        mergeable: true,
        blockers: Vec::new(),
    });
    f.scm.set_pending_comments(Vec::new());
    f.scm.set_ci_checks(vec![CiCheck {
        name: "build".to_string(),
        status: CheckStatus::Passed,
    }]);
}

fn verified_pr_session(f: &Fleet) -> fleet_core::Session {
    let mut session = pr_session("app-1", "app", 12);
    session.status = SessionStatus::Approved;
    session.metadata.insert(
        meta::VERIFY_STATUS.to_string(),
        meta::VERIFY_PASS.to_string(),
    );
    session.metadata.insert(
        meta::VERIFY_BROWSER_STATUS.to_string(),
        meta::VERIFY_BROWSER_PASS.to_string(),
    );
    f.runtime.add_handle("tmux-app-1");
    f.runtime.set_output("tmux-app-1", "waiting for review");
    session
}

fn auto_merge_fleet() -> Fleet {
    FleetBuilder::new()
        .reaction(
            keys::APPROVED_AND_GREEN,
            ReactionConfig::simple(ReactionAction::AutoMerge),
        )
        .config(|c| {
            // The sample session carries no tracker issue.
            let app = c.projects.get_mut("app").unwrap();
            app.automation.merge_gate.strict.require_completion_dry_run = false;
        })
        .build()
}

#[tokio::test]
async fn green_pr_is_merged_with_the_default_method() {
    let f = auto_merge_fleet();
    mergeable_setup(&f);
    f.manager.add_session(verified_pr_session(&f));

    f.poll().await;

    assert_eq!(f.scm.merge_calls(), vec![(12, MergeMethod::Squash)]);
    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::ReactionTriggered);
    assert_eq!(events[0].priority, Priority::Action);
}

#[tokio::test]
async fn unresolved_review_threads_block_the_merge() {
    let f = auto_merge_fleet();
    mergeable_setup(&f);
    f.scm.set_pending_comments(vec![fleet_core::PrComment {
        author: "alice".to_string(),
        body: "open question".to_string(),
        path: None,
        line: None,
    }]);
    f.manager.add_session(verified_pr_session(&f));

    f.poll().await;

    assert!(f.scm.merge_calls().is_empty());
    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::ReactionTriggered);
    assert_eq!(events[0].priority, Priority::Warning);
    assert!(events[0].data["blockers"]
        .to_string()
        .contains("unresolved review threads (1)"));

    // Status is unchanged on the next cycle: no re-trigger, no new warning.
    f.poll().await;
    assert_eq!(f.notifier.events().len(), 1);
}

#[tokio::test]
async fn missing_verify_marker_blocks_the_merge() {
    let f = auto_merge_fleet();
    mergeable_setup(&f);
    let mut session = verified_pr_session(&f);
    session.metadata.remove(meta::VERIFY_STATUS);
    f.manager.add_session(session);

    f.poll().await;

    assert!(f.scm.merge_calls().is_empty());
    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].data["blockers"]
        .to_string()
        .contains("verify marker missing"));
}

#[tokio::test]
async fn merge_failure_escalates_at_warning() {
    let f = auto_merge_fleet();
    mergeable_setup(&f);
    f.scm.fail_merge("merge conflict");
    f.manager.add_session(verified_pr_session(&f));

    f.poll().await;

    let events = f.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::ReactionEscalated);
    assert_eq!(events[0].priority, Priority::Warning);
}
