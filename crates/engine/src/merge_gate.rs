// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auto-merge action and its strict gate.
//!
//! Preconditions are evaluated in order; the first failure becomes the
//! blocker, stamps a retry cooldown, and notifies at warning. Merging only
//! happens with every enabled sub-gate green.

use crate::engine::LifecycleEngine;
use crate::reaction::{ReactionContext, ReactionOutcome};
use fleet_core::session::meta;
use fleet_core::{
    CheckStatus, Clock, EventType, OrchestratorEvent, Priority, ReviewDecision,
};
use fleet_plugins::ScmPlugin;
use std::sync::Arc;

impl<C: Clock> LifecycleEngine<C> {
    pub(crate) async fn run_auto_merge(&self, ctx: &ReactionContext<'_>) -> ReactionOutcome {
        let gate = &ctx.project.automation.merge_gate;
        let now = self.now();

        if !gate.enabled {
            return self.merge_blocked(ctx, "merge gate disabled").await;
        }

        let Some(pr) = ctx.session.pr.as_ref() else {
            return self.merge_blocked(ctx, "no PR associated with session").await;
        };
        let Some(scm) = ctx
            .project
            .scm
            .as_ref()
            .and_then(|r| self.registry.scm(&r.plugin))
        else {
            return self.merge_blocked(ctx, "no SCM plugin configured").await;
        };

        let cooldown_until = self
            .state
            .lock()
            .merge_retry_cooldown_until
            .get(&ctx.session.id)
            .copied();
        if let Some(until) = cooldown_until {
            if now < until {
                tracing::debug!(
                    session_id = %ctx.session.id,
                    until,
                    "merge retry cooldown active, skipping"
                );
                return ReactionOutcome::failed();
            }
        }

        if let Some(blocker) = self.strict_gate_blocker(ctx, &scm).await {
            return self.merge_blocked(ctx, &blocker).await;
        }

        match scm.merge_pr(pr, gate.method).await {
            Ok(()) => {
                self.state
                    .lock()
                    .merge_retry_cooldown_until
                    .remove(&ctx.session.id);
                tracing::info!(
                    session_id = %ctx.session.id,
                    pr = pr.number,
                    method = gate.method.as_str(),
                    "pr merged"
                );
                let event = OrchestratorEvent::new(
                    EventType::ReactionTriggered,
                    self.now(),
                    format!("PR #{} merged ({})", pr.number, gate.method.as_str()),
                )
                .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
                .with_priority(Priority::Action)
                .with_data(serde_json::json!({
                    "reaction": ctx.key,
                    "pr": pr.url,
                    "method": gate.method.as_str(),
                }));
                self.notify_human(&event, Priority::Action).await;
                ReactionOutcome::ok()
            }
            Err(e) => {
                self.stamp_merge_cooldown(ctx);
                tracing::warn!(
                    session_id = %ctx.session.id,
                    pr = pr.number,
                    error = %e,
                    "merge failed"
                );
                let event = OrchestratorEvent::new(
                    EventType::ReactionEscalated,
                    self.now(),
                    format!("Merging PR #{} failed: {}", pr.number, e),
                )
                .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
                .with_priority(Priority::Warning)
                .with_data(serde_json::json!({
                    "reaction": ctx.key,
                    "pr": pr.url,
                }));
                self.notify_human(&event, Priority::Warning).await;
                ReactionOutcome::escalated()
            }
        }
    }

    /// First failing strict sub-gate, as a blocker string.
    async fn strict_gate_blocker(
        &self,
        ctx: &ReactionContext<'_>,
        scm: &Arc<dyn ScmPlugin>,
    ) -> Option<String> {
        let strict = &ctx.project.automation.merge_gate.strict;
        let session = ctx.session;
        // Precondition order guarantees a PR here.
        let pr = session.pr.as_ref()?;

        if strict.require_verify_marker && session.meta(meta::VERIFY_STATUS) != Some(meta::VERIFY_PASS)
        {
            return Some(format!(
                "verify marker missing ({} != {})",
                meta::VERIFY_STATUS,
                meta::VERIFY_PASS
            ));
        }

        if strict.require_browser_marker
            && session.meta(meta::VERIFY_BROWSER_STATUS) != Some(meta::VERIFY_BROWSER_PASS)
        {
            return Some(format!(
                "browser verify marker missing ({} != {})",
                meta::VERIFY_BROWSER_STATUS,
                meta::VERIFY_BROWSER_PASS
            ));
        }

        if strict.require_approved_review_or_no_requests {
            let decision = if self.config.allowed_users.is_empty() {
                scm.get_review_decision(pr).await
            } else {
                self.filtered_review_decision(pr, scm).await
            };
            match decision {
                Ok(ReviewDecision::Approved) => {}
                Ok(ReviewDecision::None) => match scm.get_review_requests_count(pr).await {
                    Ok(0) => {}
                    Ok(n) => return Some(format!("review requests pending ({})", n)),
                    Err(e) => return Some(format!("review request probe failed: {}", e)),
                },
                Ok(ReviewDecision::ChangesRequested) => {
                    return Some("changes requested by review".to_string())
                }
                Ok(ReviewDecision::Pending) => return Some("review pending".to_string()),
                Err(e) => return Some(format!("review probe failed: {}", e)),
            }
        }

        if strict.require_no_unresolved_threads {
            match scm.get_pending_comments(pr).await {
                Ok(comments) if comments.is_empty() => {}
                Ok(comments) => {
                    return Some(format!("unresolved review threads ({})", comments.len()))
                }
                Err(e) => return Some(format!("review thread probe failed: {}", e)),
            }
        }

        if strict.require_passing_checks {
            match scm.get_ci_checks(pr).await {
                Ok(checks) => {
                    if checks.is_empty() {
                        return Some("no CI checks reported".to_string());
                    }
                    let failing: Vec<&str> = checks
                        .iter()
                        .filter(|c| c.status == CheckStatus::Failed)
                        .map(|c| c.name.as_str())
                        .collect();
                    if !failing.is_empty() {
                        return Some(format!("failing checks: {}", failing.join(", ")));
                    }
                    if checks.iter().any(|c| {
                        matches!(c.status, CheckStatus::Pending | CheckStatus::Running)
                    }) {
                        return Some("checks still running".to_string());
                    }
                    if !checks.iter().any(|c| c.status == CheckStatus::Passed) {
                        return Some("no passing checks".to_string());
                    }
                }
                Err(e) => return Some(format!("check probe failed: {}", e)),
            }
        }

        if strict.require_completion_dry_run && ctx.project.automation.completion_gate.enabled {
            if let Some(issue_id) = session.issue_id.as_ref() {
                if let Some(tracker) = ctx
                    .project
                    .tracker
                    .as_ref()
                    .and_then(|r| self.registry.tracker(&r.plugin))
                {
                    match self
                        .evaluate_completion_gate(session, ctx.project, issue_id, &tracker)
                        .await
                    {
                        crate::completion::GateVerdict::Pass { .. } => {}
                        crate::completion::GateVerdict::Fail { failure, .. } => {
                            return Some(format!("completion gate: {}", failure.reason()))
                        }
                    }
                }
            }
        }

        None
    }

    async fn merge_blocked(&self, ctx: &ReactionContext<'_>, blocker: &str) -> ReactionOutcome {
        self.stamp_merge_cooldown(ctx);
        tracing::info!(
            session_id = %ctx.session.id,
            blocker,
            "auto-merge blocked"
        );
        let event = OrchestratorEvent::new(
            EventType::ReactionTriggered,
            self.now(),
            format!("Auto-merge for session {} blocked: {}", ctx.session.id, blocker),
        )
        .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
        .with_priority(Priority::Warning)
        .with_data(serde_json::json!({
            "reaction": ctx.key,
            "blockers": [blocker],
        }));
        self.notify_human(&event, Priority::Warning).await;
        ReactionOutcome::failed()
    }

    fn stamp_merge_cooldown(&self, ctx: &ReactionContext<'_>) {
        let cooldown_ms = ctx.project.automation.merge_gate.retry_cooldown_sec * 1000;
        let until = self.now() + cooldown_ms;
        self.state
            .lock()
            .merge_retry_cooldown_until
            .insert(ctx.session.id.clone(), until);
    }
}

#[cfg(test)]
#[path = "merge_gate_tests.rs"]
mod tests;
