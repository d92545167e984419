//! Tracker progress updates and their stage/target cooldown.

use crate::prelude::*;
use fleet_core::reaction::keys;
use fleet_core::session::meta;
use fleet_core::test_support::{issue_session, pr_info};
use fleet_core::{
    CiSummary, Issue, IssueId, ReactionAction, ReactionConfig, ReviewDecision, SessionStatus,
};

fn progress_fleet() -> Fleet {
    FleetBuilder::new()
        .reaction(keys::ISSUE_PROGRESS_REVIEW_UPDATED, {
            let mut c = ReactionConfig::simple(ReactionAction::UpdateTrackerProgress);
            c.cooldown = Some("5m".to_string());
            c
        })
        .build()
}

fn review_session(f: &Fleet) -> fleet_core::Session {
    let mut session = issue_session("app-1", "app", "ISS-1");
    session.status = SessionStatus::PrOpen;
    session.pr = Some(pr_info("app", 12));
    session.branch = Some("work/iss-1".to_string());
    session.metadata.insert(
        meta::VERIFY_STATUS.to_string(),
        meta::VERIFY_PASS.to_string(),
    );
    f.runtime.add_handle("tmux-app-1");
    f.runtime.set_output("tmux-app-1", "awaiting review");
    f.scm.set_ci_summary(CiSummary::Passing);
    session
}

fn add_issue(f: &Fleet) {
    f.tracker.add_issue(Issue {
        id: IssueId::new("ISS-1"),
        title: "Add retry loop".to_string(),
        description: String::new(),
        state: "open".to_string(),
        workflow_state_name: None,
        labels: Vec::new(),
        assignee: None,
    });
}

#[tokio::test]
async fn progress_cooldown_suppresses_until_the_target_changes() {
    let f = progress_fleet();
    add_issue(&f);
    f.scm.set_review_decision(ReviewDecision::Pending);
    f.manager.add_session(review_session(&f));

    // pr_open → review_pending posts the first update targeting In Review.
    f.poll().await;
    let updates = f.tracker.updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].1.workflow_state_name.as_deref(),
        Some("In Review")
    );
    assert!(updates[0]
        .1
        .comment
        .as_deref()
        .unwrap()
        .contains("review pending"));

    // The stamped metadata lands on the next snapshot.
    f.refresh_session("app-1").await;

    // review_pending → approved five minutes later: same stage, same
    // target, inside the window → suppressed.
    f.clock.advance(std::time::Duration::from_secs(120));
    f.scm.set_review_decision(ReviewDecision::Approved);
    f.poll().await;
    assert_eq!(f.tracker.updates().len(), 1);

    // approved → changes_requested flips the target to In Progress and
    // bypasses the cooldown.
    f.refresh_session("app-1").await;
    f.scm.set_review_decision(ReviewDecision::ChangesRequested);
    f.poll().await;

    let updates = f.tracker.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(
        updates[1].1.workflow_state_name.as_deref(),
        Some("In Progress")
    );
    assert!(updates[1]
        .1
        .comment
        .as_deref()
        .unwrap()
        .contains("changes requested"));
}

#[tokio::test]
async fn progress_comment_carries_pr_branch_and_verification() {
    let f = progress_fleet();
    add_issue(&f);
    f.scm.set_review_decision(ReviewDecision::Pending);
    f.manager.add_session(review_session(&f));

    f.poll().await;

    let updates = f.tracker.updates();
    let comment = updates[0].1.comment.as_deref().unwrap();
    assert!(comment.contains("Progress update ("));
    assert!(comment.contains("- PR: https://example.com/acme/app/pull/12"));
    assert!(comment.contains("- Branch: work/iss-1"));
    assert!(comment.contains("verify_status=work_verify_pass_full"));
    assert_eq!(updates[0].1.state.as_deref(), Some("in_progress"));
}
