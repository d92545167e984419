// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `update-tracker-progress` action: posts a progress comment to the
//! session's tracker issue, throttled per stage and target workflow state.

use crate::engine::LifecycleEngine;
use crate::metadata::set;
use crate::reaction::{ReactionContext, ReactionOutcome};
use fleet_core::reaction::keys;
use fleet_core::session::meta;
use fleet_core::{
    format_utc, parse_duration, Clock, EventType, IssueUpdate, OrchestratorEvent, Priority,
    ReactionConfig,
};

/// Max rendered length of one comment line.
const MAX_LINE_LEN: usize = 240;

/// Section markers an agent may print before its one-line summaries.
const SUMMARY_MARKERS: [&str; 2] = ["개발 요약:", "development summary:"];
const IMPLEMENTATION_MARKERS: [&str; 2] = ["개발 구현:", "implementation details:"];

/// Lines of terminal output scanned for summary sections.
const SUMMARY_PROBE_LINES: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressStage {
    PrOpened,
    ReviewUpdated,
}

impl ProgressStage {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            keys::ISSUE_PROGRESS_PR_OPENED => Some(ProgressStage::PrOpened),
            keys::ISSUE_PROGRESS_REVIEW_UPDATED => Some(ProgressStage::ReviewUpdated),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::PrOpened => "pr_opened",
            ProgressStage::ReviewUpdated => "review_updated",
        }
    }
}

/// Human wording for the review stage, by triggering event.
fn review_summary(event_type: EventType) -> &'static str {
    match event_type {
        EventType::PrCreated => "PR created",
        EventType::ReviewPending => "review pending",
        EventType::ReviewChangesRequested => "changes requested",
        EventType::ReviewApproved => "review approved",
        EventType::MergeReady => "ready to merge",
        _ => "review updated",
    }
}

impl<C: Clock> LifecycleEngine<C> {
    pub(crate) async fn run_update_tracker_progress(
        &self,
        ctx: &ReactionContext<'_>,
        config: &ReactionConfig,
    ) -> ReactionOutcome {
        let session = ctx.session;
        let Some(stage) = ProgressStage::from_key(ctx.key) else {
            tracing::warn!(reaction = ctx.key, "not a progress reaction key");
            return ReactionOutcome::failed();
        };
        let Some(issue_id) = session.issue_id.clone() else {
            tracing::debug!(session_id = %session.id, "no issue for progress update");
            return ReactionOutcome::failed();
        };
        let Some(tracker) = ctx
            .project
            .tracker
            .as_ref()
            .and_then(|r| self.registry.tracker(&r.plugin))
        else {
            tracing::debug!(session_id = %session.id, "no tracker plugin for progress update");
            return ReactionOutcome::failed();
        };

        let now = self.now();
        let target_state = self.target_workflow_state(ctx, stage);

        // Cooldown: same stage, same target, inside the window → suppressed.
        // A target change always goes through.
        if let Some(cooldown) = config.cooldown.as_deref() {
            let window = parse_duration(cooldown);
            let same_stage = session.meta(meta::PROGRESS_STAGE) == Some(stage.as_str());
            let same_target =
                session.meta(meta::PROGRESS_TARGET_STATE) == target_state.as_deref();
            let updated_at = session
                .meta(meta::PROGRESS_UPDATED_AT)
                .and_then(|v| v.parse::<u64>().ok());
            if !window.is_zero() && same_stage && same_target {
                if let Some(updated_at) = updated_at {
                    if now.saturating_sub(updated_at) < window.as_millis() as u64 {
                        tracing::debug!(
                            session_id = %session.id,
                            stage = stage.as_str(),
                            "progress update suppressed by cooldown"
                        );
                        return ReactionOutcome::ok();
                    }
                }
            }
        }

        let comment = self.build_progress_comment(ctx, stage, now).await;
        let update = IssueUpdate {
            state: Some("in_progress".to_string()),
            workflow_state_name: target_state.clone(),
            comment: Some(comment),
            ..IssueUpdate::default()
        };

        match tracker.update_issue(&issue_id, &update, ctx.project).await {
            Ok(()) => {
                let patch = vec![
                    set(meta::PROGRESS_STAGE, stage.as_str()),
                    set(meta::PROGRESS_UPDATED_AT, now.to_string()),
                    set(
                        meta::PROGRESS_TARGET_STATE,
                        target_state.unwrap_or_default(),
                    ),
                ];
                if let Err(e) = self.metadata.update(&session.id, patch).await {
                    tracing::warn!(session_id = %session.id, error = %e, "progress stamp failed");
                }
                tracing::info!(
                    session_id = %session.id,
                    issue = %issue_id,
                    stage = stage.as_str(),
                    "progress comment posted"
                );
                ReactionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!(issue = %issue_id, error = %e, "progress update failed");
                let event = OrchestratorEvent::new(
                    EventType::ReactionEscalated,
                    self.now(),
                    format!("Progress update for issue {} failed: {}", issue_id, e),
                )
                .for_session(session.id.clone(), session.project_id.clone())
                .with_priority(Priority::Warning);
                self.notify_human(&event, Priority::Warning).await;
                ReactionOutcome::escalated()
            }
        }
    }

    /// Workflow state the issue should move to, by stage and trigger.
    fn target_workflow_state(
        &self,
        ctx: &ReactionContext<'_>,
        stage: ProgressStage,
    ) -> Option<String> {
        if stage != ProgressStage::ReviewUpdated {
            return None;
        }
        match ctx.event.event_type {
            EventType::ReviewChangesRequested => Some("In Progress".to_string()),
            EventType::ReviewPending | EventType::ReviewApproved | EventType::MergeReady => {
                // Only verified work is allowed to advertise itself as
                // review-ready.
                if ctx.session.meta(meta::VERIFY_STATUS) == Some(meta::VERIFY_PASS) {
                    Some("In Review".to_string())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    async fn build_progress_comment(
        &self,
        ctx: &ReactionContext<'_>,
        stage: ProgressStage,
        now: u64,
    ) -> String {
        let session = ctx.session;
        let header = match stage {
            ProgressStage::PrOpened => {
                format!("Progress update ({}): PR is now open.", format_utc(now))
            }
            ProgressStage::ReviewUpdated => format!(
                "Progress update ({}): Review stage updated ({}).",
                format_utc(now),
                review_summary(ctx.event.event_type)
            ),
        };

        let terminal = self.recent_terminal_output(ctx).await;
        let issue_title = self.issue_title(ctx).await;

        let dev_summary = session
            .meta(meta::SUMMARY)
            .map(str::to_string)
            .or_else(|| extract_section(terminal.as_deref(), &SUMMARY_MARKERS))
            .or_else(|| session.pr.as_ref().map(|pr| pr.title.clone()))
            .or(issue_title)
            .unwrap_or_else(|| "No summary available".to_string());

        let impl_summary = extract_section(terminal.as_deref(), &IMPLEMENTATION_MARKERS)
            .unwrap_or_else(|| {
                format!(
                    "Work continues on branch {}",
                    session.branch.as_deref().unwrap_or("(unknown)")
                )
            });

        let verification = format!(
            "{}={}, {}={}",
            meta::VERIFY_STATUS,
            session.meta(meta::VERIFY_STATUS).unwrap_or("unset"),
            meta::VERIFY_BROWSER_STATUS,
            session.meta(meta::VERIFY_BROWSER_STATUS).unwrap_or("unset"),
        );

        let mut lines = vec![header];
        if let Some(pr) = &session.pr {
            lines.push(format!("- PR: {}", pr.url));
        }
        lines.push(format!("- Summary: {}", dev_summary));
        lines.push(format!("- Implementation: {}", impl_summary));
        lines.push(format!("- Verification: {}", verification));
        if let Some(branch) = &session.branch {
            lines.push(format!("- Branch: {}", branch));
        }

        lines
            .into_iter()
            .map(|line| truncate_line(&line, MAX_LINE_LEN))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Recent terminal output for summary extraction. Best-effort.
    async fn recent_terminal_output(&self, ctx: &ReactionContext<'_>) -> Option<String> {
        let handle = ctx.session.runtime_handle.as_deref()?;
        let runtime = ctx
            .project
            .runtime_name(&self.config.defaults)
            .and_then(|name| self.registry.runtime(name))?;
        runtime.get_output(handle, SUMMARY_PROBE_LINES).await.ok()
    }

    async fn issue_title(&self, ctx: &ReactionContext<'_>) -> Option<String> {
        let issue_id = ctx.session.issue_id.as_ref()?;
        let tracker = ctx
            .project
            .tracker
            .as_ref()
            .and_then(|r| self.registry.tracker(&r.plugin))?;
        tracker
            .get_issue(issue_id, ctx.project)
            .await
            .ok()
            .map(|i| i.title)
    }
}

/// Find a marker in the output and return the text after it: the rest of
/// the marker's line, or the next non-empty line.
fn extract_section(output: Option<&str>, markers: &[&str]) -> Option<String> {
    let output = output?;
    let lines: Vec<&str> = output.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        for marker in markers {
            let Some(pos) = line.find(marker) else {
                continue;
            };
            let after = line[pos + marker.len()..].trim();
            if !after.is_empty() {
                return Some(after.to_string());
            }
            if let Some(next) = lines[i + 1..].iter().find(|l| !l.trim().is_empty()) {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

/// Truncate to `max` characters with a `...` suffix on overflow.
fn truncate_line(line: &str, max: usize) -> String {
    if line.chars().count() <= max {
        return line.to_string();
    }
    let kept: String = line.chars().take(max).collect();
    format!("{}...", kept)
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
