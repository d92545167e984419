//! Completion gate behavior through the issue-completed reaction.

use crate::prelude::*;
use fleet_core::reaction::keys;
use fleet_core::session::meta;
use fleet_core::test_support::{issue_session, pr_info};
use fleet_core::{
    Issue, IssueComment, IssueId, PrState, ReactionAction, ReactionConfig, SessionStatus,
};

const DESCRIPTION: &str = "\
Acceptance criteria:
- [ ] a
- [x] b
- [ ] c
```
- [ ] fenced example, not part of the checklist
```";

fn completion_fleet(sync: bool) -> Fleet {
    FleetBuilder::new()
        .reaction(
            keys::ISSUE_COMPLETED,
            ReactionConfig::simple(ReactionAction::CompleteTrackerIssue),
        )
        .config(|c| {
            let app = c.projects.get_mut("app").unwrap();
            app.automation.completion_gate.sync_checklist_from_evidence = sync;
        })
        .build()
}

fn merged_session(f: &Fleet) -> fleet_core::Session {
    let mut session = issue_session("app-1", "app", "ISS-1");
    session.status = SessionStatus::Mergeable;
    session.pr = Some(pr_info("app", 12));
    session.branch = Some("work/iss-1".to_string());
    session.metadata.insert(
        meta::VERIFY_STATUS.to_string(),
        meta::VERIFY_PASS.to_string(),
    );
    session.metadata.insert(
        meta::VERIFY_BROWSER_STATUS.to_string(),
        meta::VERIFY_BROWSER_PASS.to_string(),
    );
    f.runtime.add_handle("tmux-app-1");
    f.runtime.set_output("tmux-app-1", "merged upstream");
    f.scm.set_pr_state(PrState::Merged);
    session
}

fn add_checklist_issue(f: &Fleet) {
    f.tracker.add_issue(Issue {
        id: IssueId::new("ISS-1"),
        title: "Add retry loop".to_string(),
        description: DESCRIPTION.to_string(),
        state: "open".to_string(),
        workflow_state_name: Some("In Review".to_string()),
        labels: Vec::new(),
        assignee: None,
    });
    f.tracker.add_comment(
        &IssueId::new("ISS-1"),
        IssueComment {
            author: "verifier".to_string(),
            body: "검증 근거: manual verified".to_string(),
            created_at: 10,
        },
    );
}

#[tokio::test]
async fn merged_pr_auto_syncs_checklist_and_closes_issue() {
    let f = completion_fleet(true);
    add_checklist_issue(&f);
    f.manager.add_session(merged_session(&f));

    f.poll().await;

    let updates = f.tracker.updates();
    assert_eq!(updates.len(), 2, "expected sync + close, got {:?}", updates);

    // First update rewrites the checklist and announces the auto-check.
    let (_, sync) = &updates[0];
    let rewritten = sync.description.as_deref().unwrap();
    assert!(rewritten.contains("- [x] a"));
    assert!(rewritten.contains("- [x] c"));
    assert!(rewritten.contains("- [ ] fenced example"));
    assert!(sync
        .comment
        .as_deref()
        .unwrap()
        .contains("Automatically checked 2"));

    // Second update closes with the audit line.
    let (_, close) = &updates[1];
    assert_eq!(close.state.as_deref(), Some("closed"));
    assert!(close.comment.as_deref().unwrap().contains("3/3"));

    // Acceptance audit in session metadata.
    let meta_doc = f.meta("app-1").await;
    assert_eq!(
        meta_doc.get("acceptance_total").map(String::as_str),
        Some("3")
    );
    assert_eq!(
        meta_doc.get("acceptance_checked").map(String::as_str),
        Some("3")
    );
    assert_eq!(
        meta_doc.get("acceptance_status").map(String::as_str),
        Some("auto_checked")
    );
}

#[tokio::test]
async fn incomplete_checklist_without_sync_blocks_the_close() {
    let f = completion_fleet(false);
    add_checklist_issue(&f);
    f.manager.add_session(merged_session(&f));

    f.poll().await;

    assert!(f.tracker.updates().is_empty());
    let meta_doc = f.meta("app-1").await;
    assert_eq!(
        meta_doc.get("acceptance_status").map(String::as_str),
        Some("blocked_checklist_incomplete")
    );
    // The block is surfaced to a human at warning.
    let warnings: Vec<_> = f
        .notifier
        .events()
        .into_iter()
        .filter(|e| e.priority == fleet_core::Priority::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn missing_verify_markers_block_the_close_outright() {
    let f = completion_fleet(true);
    add_checklist_issue(&f);
    let mut session = merged_session(&f);
    session.metadata.remove(meta::VERIFY_BROWSER_STATUS);
    f.manager.add_session(session);

    f.poll().await;

    assert!(f.tracker.updates().is_empty());
    // No acceptance stamp: the gate never ran.
    let meta_doc = f.meta("app-1").await;
    assert!(!meta_doc.contains_key("acceptance_status"));
}

#[tokio::test]
async fn missing_evidence_blocks_the_close() {
    let f = completion_fleet(true);
    f.tracker.add_issue(Issue {
        id: IssueId::new("ISS-1"),
        title: "Add retry loop".to_string(),
        description: "- [x] a\n- [x] b".to_string(),
        state: "open".to_string(),
        workflow_state_name: None,
        labels: Vec::new(),
        assignee: None,
    });
    f.manager.add_session(merged_session(&f));

    f.poll().await;

    assert!(f.tracker.updates().is_empty());
    let meta_doc = f.meta("app-1").await;
    assert_eq!(
        meta_doc.get("acceptance_status").map(String::as_str),
        Some("blocked_missing_evidence")
    );
}
