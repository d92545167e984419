// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session model: the immutable snapshot of one supervised agent session
//! and its lifecycle status.

use crate::id::{IssueId, ProjectId, SessionId};
use crate::scm::PrInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Lifecycle status of a session. Closed set; `merged` and `killed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Spawning,
    Working,
    NeedsInput,
    Stuck,
    PrOpen,
    CiFailed,
    ReviewPending,
    ChangesRequested,
    Approved,
    Mergeable,
    Merged,
    Killed,
    Errored,
}

impl SessionStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Merged | SessionStatus::Killed)
    }

    /// Stable string form used in sidecar metadata and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Spawning => "spawning",
            SessionStatus::Working => "working",
            SessionStatus::NeedsInput => "needs_input",
            SessionStatus::Stuck => "stuck",
            SessionStatus::PrOpen => "pr_open",
            SessionStatus::CiFailed => "ci_failed",
            SessionStatus::ReviewPending => "review_pending",
            SessionStatus::ChangesRequested => "changes_requested",
            SessionStatus::Approved => "approved",
            SessionStatus::Mergeable => "mergeable",
            SessionStatus::Merged => "merged",
            SessionStatus::Killed => "killed",
            SessionStatus::Errored => "errored",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spawning" => Ok(SessionStatus::Spawning),
            "working" => Ok(SessionStatus::Working),
            "needs_input" => Ok(SessionStatus::NeedsInput),
            "stuck" => Ok(SessionStatus::Stuck),
            "pr_open" => Ok(SessionStatus::PrOpen),
            "ci_failed" => Ok(SessionStatus::CiFailed),
            "review_pending" => Ok(SessionStatus::ReviewPending),
            "changes_requested" => Ok(SessionStatus::ChangesRequested),
            "approved" => Ok(SessionStatus::Approved),
            "mergeable" => Ok(SessionStatus::Mergeable),
            "merged" => Ok(SessionStatus::Merged),
            "killed" => Ok(SessionStatus::Killed),
            "errored" => Ok(SessionStatus::Errored),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// Well-known sidecar metadata keys.
///
/// The sidecar file is stringly-typed by contract: operators and external
/// scripts read and write these keys directly, so the names are stable.
pub mod meta {
    /// Last persisted lifecycle status.
    pub const STATUS: &str = "status";
    /// PR URL once one is known (detected or adopted).
    pub const PR: &str = "pr";
    /// Branch name for adopted sessions.
    pub const BRANCH: &str = "branch";
    /// Set to "true" on sessions synthesized from external PRs.
    pub const ADOPTED: &str = "adopted";
    /// One-line development summary provided by the agent.
    pub const SUMMARY: &str = "summary";

    /// Verification marker set by external verify tooling.
    pub const VERIFY_STATUS: &str = "verify_status";
    /// Value of [`VERIFY_STATUS`] that passes the merge/completion gates.
    pub const VERIFY_PASS: &str = "work_verify_pass_full";
    /// Browser verification marker.
    pub const VERIFY_BROWSER_STATUS: &str = "verify_browser_status";
    /// Value of [`VERIFY_BROWSER_STATUS`] that passes the gates.
    pub const VERIFY_BROWSER_PASS: &str = "work_verify_browser_pass";

    /// Tracker progress bookkeeping.
    pub const PROGRESS_STAGE: &str = "progress_stage";
    pub const PROGRESS_UPDATED_AT: &str = "progress_updated_at";
    pub const PROGRESS_TARGET_STATE: &str = "progress_target_state";

    /// Acceptance-checklist audit trail written by the completion gate.
    pub const ACCEPTANCE_TOTAL: &str = "acceptance_total";
    pub const ACCEPTANCE_CHECKED: &str = "acceptance_checked";
    pub const ACCEPTANCE_UNCHECKED: &str = "acceptance_unchecked";
    pub const ACCEPTANCE_STATUS: &str = "acceptance_status";
    pub const ACCEPTANCE_CHECKED_AT: &str = "acceptance_checked_at";

    /// Stuck-prompt detection bookkeeping.
    pub const STUCK_DETECTED_AT: &str = "stuck_detected_at";
    pub const STUCK_RECOVERY_SENT_AT: &str = "stuck_recovery_sent_at";

    /// Codex rate-limit prompt auto-dismissal record.
    pub const CODEX_AUTODISMISS_CHOICE: &str = "codex_rate_limit_prompt_autodismiss_choice";
    pub const CODEX_AUTODISMISS_AT: &str = "codex_rate_limit_prompt_autodismiss_at";
}

/// Immutable snapshot of one session, handed to the engine each poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<PathBuf>,
    /// Handle into the runtime plugin (e.g. a tmux session name).
    /// Absent for adopted sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_handle: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub last_activity_at: u64,
    /// Last persisted status.
    pub status: SessionStatus,
    /// Stringly-typed sidecar metadata (see [`meta`]).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Session {
    /// Metadata value lookup treating empty strings as absent.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Whether this session was synthesized from an external PR.
    /// Adopted sessions have no runtime to talk to.
    pub fn is_adopted(&self) -> bool {
        self.meta(meta::ADOPTED) == Some("true") || self.runtime_handle.is_none()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
