// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion gate: the acceptance checklist in an issue description plus
//! verification evidence decide whether the tracker issue may be closed.

use crate::engine::LifecycleEngine;
use crate::metadata::set;
use crate::reaction::{ReactionContext, ReactionOutcome};
use fleet_core::session::meta;
use fleet_core::{
    Clock, EventType, IssueId, IssueUpdate, OrchestratorEvent, Priority, ProjectConfig, Session,
};
use fleet_plugins::TrackerPlugin;
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;

/// Checklist item: `- [ ] text`, `* [x] text`, or `1. [X] text`.
#[allow(clippy::unwrap_used)] // literal pattern
fn item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:[-*]|\d+\.)\s+\[( |x|X)\]\s+.*$").unwrap())
}

/// Checklist scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistSummary {
    pub total: usize,
    pub checked: usize,
    pub unchecked: usize,
    /// The description with every item checked; used only when auto-sync
    /// is enabled.
    pub rewritten: String,
}

/// Scan a description line by line, ignoring fenced code blocks.
///
/// A fence opens with three or more backticks or tildes; it closes on a
/// fence of the same character at least as long as the opener.
pub fn summarize_checklist(description: &str) -> ChecklistSummary {
    let mut total = 0;
    let mut checked = 0;
    let mut fence: Option<(char, usize)> = None;
    let mut rewritten: Vec<String> = Vec::new();

    for line in description.lines() {
        let trimmed = line.trim_start();
        if let Some(len) = fence_length(trimmed) {
            let ch = trimmed.chars().next().unwrap_or('`');
            match fence {
                Some((open_ch, open_len)) if ch == open_ch && len >= open_len => fence = None,
                Some(_) => {}
                None => fence = Some((ch, len)),
            }
            rewritten.push(line.to_string());
            continue;
        }

        if fence.is_none() {
            if let Some(caps) = item_regex().captures(line) {
                total += 1;
                let unchecked_box = caps.get(1).map(|m| m.as_str()) == Some(" ");
                if unchecked_box {
                    rewritten.push(line.replacen("[ ]", "[x]", 1));
                } else {
                    checked += 1;
                    rewritten.push(line.to_string());
                }
                continue;
            }
        }

        rewritten.push(line.to_string());
    }

    ChecklistSummary {
        total,
        checked,
        unchecked: total - checked,
        rewritten: rewritten.join("\n"),
    }
}

/// Fence-marker length if the line starts one (``` or ~~~, any length ≥ 3).
fn fence_length(trimmed: &str) -> Option<usize> {
    for ch in ['`', '~'] {
        let len = trimmed.chars().take_while(|c| *c == ch).count();
        if len >= 3 {
            return Some(len);
        }
    }
    None
}

/// Why the completion gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    NoChecklist,
    InvalidEvidencePattern,
    MissingEvidence,
    ChecklistIncomplete,
    GateError,
}

impl GateFailure {
    /// Short reason for blockers and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            GateFailure::NoChecklist => "no checklist",
            GateFailure::InvalidEvidencePattern => "invalid evidence pattern",
            GateFailure::MissingEvidence => "missing evidence",
            GateFailure::ChecklistIncomplete => "checklist incomplete",
            GateFailure::GateError => "gate error",
        }
    }

    /// Acceptance-status metadata value.
    pub fn acceptance_status(&self) -> &'static str {
        match self {
            GateFailure::NoChecklist => "blocked_no_checkboxes",
            GateFailure::MissingEvidence => "blocked_missing_evidence",
            GateFailure::ChecklistIncomplete => "blocked_checklist_incomplete",
            GateFailure::InvalidEvidencePattern | GateFailure::GateError => "blocked_gate_error",
        }
    }
}

/// Completion gate verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Pass {
        summary: ChecklistSummary,
        /// True when unchecked items remain but evidence allows auto-sync.
        can_auto_sync_checklist: bool,
    },
    Fail {
        failure: GateFailure,
        /// Checklist numbers, when the description was readable.
        summary: Option<ChecklistSummary>,
    },
}

impl<C: Clock> LifecycleEngine<C> {
    /// Evaluate the completion gate read-only: no tracker writes, no
    /// metadata stamps. The merge gate's dry-run sub-gate uses this too.
    pub(crate) async fn evaluate_completion_gate(
        &self,
        _session: &Session,
        project: &ProjectConfig,
        issue_id: &IssueId,
        tracker: &Arc<dyn TrackerPlugin>,
    ) -> GateVerdict {
        let gate = &project.automation.completion_gate;

        let issue = match tracker.get_issue(issue_id, project).await {
            Ok(issue) => issue,
            Err(e) => {
                tracing::warn!(issue = %issue_id, error = %e, "issue fetch failed");
                return GateVerdict::Fail {
                    failure: GateFailure::GateError,
                    summary: None,
                };
            }
        };

        let summary = summarize_checklist(&issue.description);
        if summary.total == 0 {
            return GateVerdict::Fail {
                failure: GateFailure::NoChecklist,
                summary: Some(summary),
            };
        }

        let evidence = match Regex::new(&format!("(?i){}", gate.evidence_pattern)) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(pattern = %gate.evidence_pattern, error = %e, "bad evidence pattern");
                return GateVerdict::Fail {
                    failure: GateFailure::InvalidEvidencePattern,
                    summary: Some(summary),
                };
            }
        };

        // Evidence lives in the description or any comment. Comment fetch is
        // best-effort; on failure the description alone decides.
        let mut texts = vec![issue.description.clone()];
        match tracker.list_comments(issue_id, project).await {
            Ok(comments) => texts.extend(comments.into_iter().map(|c| c.body)),
            Err(e) => {
                tracing::debug!(issue = %issue_id, error = %e, "comment fetch failed");
            }
        }
        if !texts.iter().any(|t| evidence.is_match(t)) {
            return GateVerdict::Fail {
                failure: GateFailure::MissingEvidence,
                summary: Some(summary),
            };
        }

        if summary.unchecked > 0 {
            if gate.sync_checklist_from_evidence {
                return GateVerdict::Pass {
                    summary,
                    can_auto_sync_checklist: true,
                };
            }
            return GateVerdict::Fail {
                failure: GateFailure::ChecklistIncomplete,
                summary: Some(summary),
            };
        }

        GateVerdict::Pass {
            summary,
            can_auto_sync_checklist: false,
        }
    }

    /// `complete-tracker-issue` action: verify markers, gate, optional
    /// checklist auto-sync, then the closing update.
    pub(crate) async fn run_complete_tracker_issue(
        &self,
        ctx: &ReactionContext<'_>,
    ) -> ReactionOutcome {
        let session = ctx.session;
        let Some(issue_id) = session.issue_id.clone() else {
            tracing::debug!(session_id = %session.id, "no issue to complete");
            return ReactionOutcome::failed();
        };
        let Some(tracker) = ctx
            .project
            .tracker
            .as_ref()
            .and_then(|r| self.registry.tracker(&r.plugin))
        else {
            tracing::warn!(session_id = %session.id, "no tracker plugin configured");
            return ReactionOutcome::failed();
        };

        // Verify markers gate the tracker mutation outright.
        let verify = session.meta(meta::VERIFY_STATUS);
        let browser = session.meta(meta::VERIFY_BROWSER_STATUS);
        if verify != Some(meta::VERIFY_PASS) || browser != Some(meta::VERIFY_BROWSER_PASS) {
            return self
                .completion_blocked(
                    ctx,
                    &issue_id,
                    None,
                    &format!(
                        "verification markers not set (verify_status={}, verify_browser_status={})",
                        verify.unwrap_or("unset"),
                        browser.unwrap_or("unset")
                    ),
                )
                .await;
        }

        // With the gate disabled the verify markers alone guard the close.
        if !ctx.project.automation.completion_gate.enabled {
            let audit = format!(
                "Closing issue: {}={}, {}={}, completion gate disabled.",
                meta::VERIFY_STATUS,
                meta::VERIFY_PASS,
                meta::VERIFY_BROWSER_STATUS,
                meta::VERIFY_BROWSER_PASS,
            );
            let close = IssueUpdate::close_with_comment(audit);
            return match tracker.update_issue(&issue_id, &close, ctx.project).await {
                Ok(()) => ReactionOutcome::ok(),
                Err(e) => self.completion_failed(ctx, &issue_id, &e.to_string()).await,
            };
        }

        let verdict = self
            .evaluate_completion_gate(session, ctx.project, &issue_id, &tracker)
            .await;

        let summary = match verdict {
            GateVerdict::Fail { failure, summary } => {
                self.stamp_acceptance(session, summary.as_ref(), failure.acceptance_status())
                    .await;
                return self
                    .completion_blocked(
                        ctx,
                        &issue_id,
                        Some(failure),
                        &format!("completion gate failed: {}", failure.reason()),
                    )
                    .await;
            }
            GateVerdict::Pass {
                summary,
                can_auto_sync_checklist,
            } => {
                if can_auto_sync_checklist {
                    let update = IssueUpdate {
                        description: Some(summary.rewritten.clone()),
                        comment: Some(format!(
                            "Automatically checked {} remaining checklist item(s) based on \
                             verification evidence.",
                            summary.unchecked
                        )),
                        ..IssueUpdate::default()
                    };
                    if let Err(e) = tracker.update_issue(&issue_id, &update, ctx.project).await {
                        tracing::warn!(issue = %issue_id, error = %e, "checklist sync failed");
                        return self.completion_failed(ctx, &issue_id, &e.to_string()).await;
                    }
                    let mut synced = summary.clone();
                    synced.checked = synced.total;
                    synced.unchecked = 0;
                    self.stamp_acceptance(session, Some(&synced), "auto_checked")
                        .await;
                    synced
                } else {
                    self.stamp_acceptance(session, Some(&summary), "passed").await;
                    summary
                }
            }
        };

        let audit = format!(
            "Closing issue: {}={}, {}={}, acceptance checklist {}/{} complete.",
            meta::VERIFY_STATUS,
            meta::VERIFY_PASS,
            meta::VERIFY_BROWSER_STATUS,
            meta::VERIFY_BROWSER_PASS,
            summary.checked,
            summary.total,
        );
        let close = IssueUpdate::close_with_comment(audit);
        match tracker.update_issue(&issue_id, &close, ctx.project).await {
            Ok(()) => {
                tracing::info!(issue = %issue_id, session_id = %session.id, "issue closed");
                ReactionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!(issue = %issue_id, error = %e, "issue close failed");
                self.completion_failed(ctx, &issue_id, &e.to_string()).await
            }
        }
    }

    /// Stamp the acceptance audit trail in session metadata.
    async fn stamp_acceptance(
        &self,
        session: &Session,
        summary: Option<&ChecklistSummary>,
        status: &str,
    ) {
        let now = self.now();
        let mut patch = vec![
            set(meta::ACCEPTANCE_STATUS, status),
            set(meta::ACCEPTANCE_CHECKED_AT, now.to_string()),
        ];
        if let Some(summary) = summary {
            patch.push(set(meta::ACCEPTANCE_TOTAL, summary.total.to_string()));
            patch.push(set(meta::ACCEPTANCE_CHECKED, summary.checked.to_string()));
            patch.push(set(meta::ACCEPTANCE_UNCHECKED, summary.unchecked.to_string()));
        }
        if let Err(e) = self.metadata.update(&session.id, patch).await {
            tracing::warn!(session_id = %session.id, error = %e, "acceptance stamp failed");
        }
    }

    /// Gate blocked: warn a human, no tracker mutation, no escalation.
    async fn completion_blocked(
        &self,
        ctx: &ReactionContext<'_>,
        issue_id: &IssueId,
        failure: Option<GateFailure>,
        message: &str,
    ) -> ReactionOutcome {
        let event = OrchestratorEvent::new(
            EventType::ReactionTriggered,
            self.now(),
            format!("Issue {} not closed: {}", issue_id, message),
        )
        .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
        .with_priority(Priority::Warning)
        .with_data(serde_json::json!({
            "reaction": ctx.key,
            "issue": issue_id.as_str(),
            "failure": failure.map(|f| f.acceptance_status()),
        }));
        self.notify_human(&event, Priority::Warning).await;
        ReactionOutcome::failed()
    }

    /// Tracker write failed after the gate passed: escalate at warning.
    async fn completion_failed(
        &self,
        ctx: &ReactionContext<'_>,
        issue_id: &IssueId,
        error: &str,
    ) -> ReactionOutcome {
        let event = OrchestratorEvent::new(
            EventType::ReactionEscalated,
            self.now(),
            format!("Tracker update for issue {} failed: {}", issue_id, error),
        )
        .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
        .with_priority(Priority::Warning)
        .with_data(serde_json::json!({
            "reaction": ctx.key,
            "issue": issue_id.as_str(),
        }));
        self.notify_human(&event, Priority::Warning).await;
        ReactionOutcome::escalated()
    }
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
