// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared by this crate's tests and (via the `test-support`
//! feature) by other crates' tests.
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::unwrap_used)]

use crate::config::ProjectConfig;
use crate::id::{IssueId, ProjectId, SessionId};
use crate::scm::PrInfo;
use crate::session::{Session, SessionStatus};
use std::collections::HashMap;

/// A project config with sensible test defaults and no plugins wired.
pub fn project(id: &str) -> ProjectConfig {
    ProjectConfig {
        name: id.to_string(),
        repo: format!("acme/{}", id),
        path: format!("/srv/{}", id).into(),
        default_branch: "main".to_string(),
        session_prefix: id.to_string(),
        runtime: None,
        agent: None,
        workspace: None,
        tracker: None,
        scm: None,
        reactions: HashMap::new(),
        automation: Default::default(),
    }
}

/// A minimal session snapshot in `spawning` with no runtime attached.
pub fn session(id: &str, project: &str) -> Session {
    Session {
        id: SessionId::new(id),
        project_id: ProjectId::new(project),
        branch: None,
        issue_id: None,
        pr: None,
        workspace_path: None,
        runtime_handle: None,
        created_at: 0,
        last_activity_at: 0,
        status: SessionStatus::Spawning,
        metadata: HashMap::new(),
    }
}

/// A session with a live runtime handle, as the session manager would
/// report for a freshly spawned agent.
pub fn live_session(id: &str, project: &str) -> Session {
    let mut s = session(id, project);
    s.runtime_handle = Some(format!("tmux-{}", id));
    s
}

/// A live session that already has a PR attached.
pub fn pr_session(id: &str, project: &str, pr_number: u64) -> Session {
    let mut s = live_session(id, project);
    s.branch = Some(format!("work/{}", id));
    s.status = SessionStatus::PrOpen;
    s.pr = Some(pr_info(project, pr_number));
    s
}

/// A session working a tracker issue.
pub fn issue_session(id: &str, project: &str, issue: &str) -> Session {
    let mut s = live_session(id, project);
    s.issue_id = Some(IssueId::new(issue));
    s
}

/// PR coordinates on `acme/{repo}`.
pub fn pr_info(repo: &str, number: u64) -> PrInfo {
    PrInfo {
        number,
        url: format!("https://example.com/acme/{}/pull/{}", repo, number),
        title: format!("PR #{}", number),
        owner: "acme".to_string(),
        repo: repo.to_string(),
        branch: format!("work/{}", number),
        base_branch: "main".to_string(),
        is_draft: false,
        author: None,
    }
}
