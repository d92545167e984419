// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction executor: one configured reaction per invocation, with attempt
//! accounting, escalation thresholds, and the action dispatch.

use crate::engine::LifecycleEngine;
use fleet_core::reaction::keys;
use fleet_core::{
    parse_duration, Clock, EscalateAfter, EventType, OrchestratorEvent, PrComment, Priority,
    ProjectConfig, ReactionAction, ReactionConfig, ReactionTracker, Session,
};
use fleet_plugins::SpawnRequest;

/// Result of one reaction invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionOutcome {
    /// The action ran to completion.
    pub success: bool,
    /// An escalation event was emitted instead of (or after) the action.
    pub escalated: bool,
    /// The event was handled; the router suppresses its default notification.
    pub handled: bool,
}

impl ReactionOutcome {
    pub(crate) fn ok() -> Self {
        Self {
            success: true,
            escalated: false,
            handled: true,
        }
    }

    pub(crate) fn failed() -> Self {
        Self {
            success: false,
            escalated: false,
            handled: true,
        }
    }

    pub(crate) fn escalated() -> Self {
        Self {
            success: false,
            escalated: true,
            handled: true,
        }
    }
}

/// Everything an action needs to run.
pub(crate) struct ReactionContext<'a> {
    pub session: &'a Session,
    pub project: &'a ProjectConfig,
    pub event: &'a OrchestratorEvent,
    pub key: &'a str,
}

/// Built-in messages for `send-to-agent`, keyed by reaction key.
pub(crate) fn default_message(key: &str) -> &'static str {
    match key {
        keys::CI_FAILED => {
            "CI checks are failing on your PR. Investigate the failures, fix them, and push an update."
        }
        keys::CHANGES_REQUESTED => {
            "A reviewer requested changes on your PR. Address the review comments and push an update."
        }
        keys::BUGBOT_COMMENTS => {
            "Automated review left comments on your PR. Address them and push an update."
        }
        keys::ISSUE_COMMENTED => {
            "A new comment was posted on your tracker issue. Review it and act on anything actionable."
        }
        _ => "Please continue with the task.",
    }
}

impl<C: Clock> LifecycleEngine<C> {
    /// Run one reaction. Never returns an error: failures are encoded in the
    /// outcome so the poller can retry on the next cycle.
    pub(crate) async fn execute_reaction(
        &self,
        ctx: &ReactionContext<'_>,
        config: &ReactionConfig,
    ) -> ReactionOutcome {
        let now = self.now();

        // Attempt accounting. The tracker lives exactly as long as the
        // session stays in the status that triggered this reaction.
        let (attempts, first_triggered) = {
            let mut state = self.state.lock();
            let tracker = state
                .reaction_trackers
                .entry((ctx.session.id.clone(), ctx.key.to_string()))
                .or_insert_with(|| ReactionTracker::started_at(now));
            tracker.attempts += 1;
            (tracker.attempts, tracker.first_triggered)
        };

        if self.should_escalate(config, attempts, first_triggered, now) {
            tracing::warn!(
                session_id = %ctx.session.id,
                reaction = ctx.key,
                attempts,
                "escalation threshold crossed"
            );
            let priority = config.priority.unwrap_or(Priority::Urgent);
            let event = OrchestratorEvent::new(
                EventType::ReactionEscalated,
                now,
                format!(
                    "Reaction {} for session {} escalated after {} attempt(s)",
                    ctx.key, ctx.session.id, attempts
                ),
            )
            .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
            .with_priority(priority)
            .with_data(serde_json::json!({
                "reaction": ctx.key,
                "attempts": attempts,
                "trigger": ctx.event.event_type.as_str(),
            }));
            self.notify_human(&event, priority).await;
            return ReactionOutcome::escalated();
        }

        match config.action {
            ReactionAction::Notify => self.run_notify(ctx, config).await,
            ReactionAction::SendToAgent => self.run_send_to_agent(ctx, config).await,
            ReactionAction::AutoMerge => self.run_auto_merge(ctx).await,
            ReactionAction::SpawnReviewer => self.run_spawn_reviewer(ctx, config),
            ReactionAction::SpawnAgent => self.run_spawn_agent(ctx).await,
            ReactionAction::CompleteTrackerIssue => self.run_complete_tracker_issue(ctx).await,
            ReactionAction::UpdateTrackerProgress => {
                self.run_update_tracker_progress(ctx, config).await
            }
        }
    }

    fn should_escalate(
        &self,
        config: &ReactionConfig,
        attempts: u32,
        first_triggered: u64,
        now: u64,
    ) -> bool {
        if let Some(retries) = config.retries {
            if attempts > retries {
                return true;
            }
        }
        match &config.escalate_after {
            Some(EscalateAfter::Count(count)) => attempts > *count,
            Some(EscalateAfter::Window(window)) => {
                let window = parse_duration(window);
                // A malformed window parses to zero and disables this check.
                !window.is_zero()
                    && now.saturating_sub(first_triggered) > window.as_millis() as u64
            }
            None => false,
        }
    }

    async fn run_notify(
        &self,
        ctx: &ReactionContext<'_>,
        config: &ReactionConfig,
    ) -> ReactionOutcome {
        let priority = config.priority.unwrap_or(Priority::Info);
        let message = config
            .message
            .clone()
            .unwrap_or_else(|| ctx.event.message.clone());
        let event = OrchestratorEvent::new(EventType::ReactionTriggered, self.now(), message)
            .for_session(ctx.session.id.clone(), ctx.session.project_id.clone())
            .with_priority(priority)
            .with_data(serde_json::json!({
                "reaction": ctx.key,
                "trigger": ctx.event.event_type.as_str(),
            }));
        self.notify_human(&event, priority).await;
        ReactionOutcome::ok()
    }

    async fn run_send_to_agent(
        &self,
        ctx: &ReactionContext<'_>,
        config: &ReactionConfig,
    ) -> ReactionOutcome {
        // Adopted sessions have nothing to type into.
        if ctx.session.is_adopted() {
            tracing::debug!(
                session_id = %ctx.session.id,
                reaction = ctx.key,
                "adopted session, downgrading send-to-agent to notify"
            );
            return self.run_notify(ctx, config).await;
        }

        let mut message = config
            .message
            .clone()
            .unwrap_or_else(|| default_message(ctx.key).to_string());

        // For review-driven sends with a trust list, the message becomes the
        // trusted reviewers' comments verbatim; an empty trusted set means
        // there is nothing for the agent to act on.
        if matches!(ctx.key, keys::CHANGES_REQUESTED | keys::BUGBOT_COMMENTS)
            && !self.config.allowed_users.is_empty()
        {
            match self.trusted_pr_comments(ctx).await {
                Some(comments) if comments.is_empty() => {
                    tracing::debug!(
                        session_id = %ctx.session.id,
                        reaction = ctx.key,
                        "no trusted reviewer comments, nothing to send"
                    );
                    return ReactionOutcome::ok();
                }
                Some(comments) => {
                    message = format_trusted_comments(&comments);
                }
                None => {}
            }
        }

        match self.sessions.send(&ctx.session.id, &message).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %ctx.session.id,
                    reaction = ctx.key,
                    "message sent to agent"
                );
                ReactionOutcome::ok()
            }
            Err(e) => {
                // No escalation here: the attempt counter already advanced,
                // and the next cycle retries.
                tracing::warn!(session_id = %ctx.session.id, error = %e, "send to agent failed");
                ReactionOutcome::failed()
            }
        }
    }

    /// Trusted-reviewer comments for the session's PR, or `None` when the
    /// probe is unavailable and the configured message should stand.
    async fn trusted_pr_comments(&self, ctx: &ReactionContext<'_>) -> Option<Vec<PrComment>> {
        let pr = ctx.session.pr.as_ref()?;
        let scm = ctx
            .project
            .scm
            .as_ref()
            .and_then(|r| self.registry.scm(&r.plugin))?;
        match scm.get_pending_comments(pr).await {
            Ok(comments) => Some(
                comments
                    .into_iter()
                    .filter(|c| self.config.allowed_users.contains(&c.author))
                    .collect(),
            ),
            Err(e) => {
                tracing::debug!(pr = pr.number, error = %e, "pending comments probe failed");
                None
            }
        }
    }

    fn run_spawn_reviewer(
        &self,
        ctx: &ReactionContext<'_>,
        config: &ReactionConfig,
    ) -> ReactionOutcome {
        let Some(script) = config.script.as_deref() else {
            tracing::warn!(reaction = ctx.key, "spawn-reviewer has no script configured");
            return ReactionOutcome::failed();
        };

        let mut command = std::process::Command::new(script);
        command
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .env("FLEET_PROJECT_ID", ctx.session.project_id.as_str())
            .env("FLEET_SESSION_ID", ctx.session.id.as_str())
            .env("FLEET_REPO", &ctx.project.repo);
        if let Some(pr) = &ctx.session.pr {
            command
                .env("FLEET_PR_NUMBER", pr.number.to_string())
                .env("FLEET_PR_URL", &pr.url)
                .env("FLEET_PR_BRANCH", &pr.branch)
                .env("FLEET_PR_TITLE", &pr.title);
        }

        // Detached: the child is never awaited. On Unix it is reparented to
        // init once this process drops the handle.
        match command.spawn() {
            Ok(child) => {
                tracing::info!(
                    session_id = %ctx.session.id,
                    script,
                    pid = child.id(),
                    "reviewer process spawned"
                );
                drop(child);
                ReactionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!(script, error = %e, "reviewer spawn failed");
                ReactionOutcome::failed()
            }
        }
    }

    async fn run_spawn_agent(&self, ctx: &ReactionContext<'_>) -> ReactionOutcome {
        let request = SpawnRequest {
            project_id: ctx.session.project_id.clone(),
            issue_id: ctx.session.issue_id.clone(),
        };
        match self.sessions.spawn(&request).await {
            Ok(session) => {
                tracing::info!(spawned = %session.id, reaction = ctx.key, "agent spawned");
                ReactionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!(error = %e, reaction = ctx.key, "agent spawn failed");
                ReactionOutcome::failed()
            }
        }
    }
}

/// Render trusted reviewer comments plus the instruction that keeps the
/// agent off the untrusted remainder of the thread.
fn format_trusted_comments(comments: &[PrComment]) -> String {
    let mut out = String::from("Trusted reviewers left the following comments:\n");
    for comment in comments {
        match (&comment.path, comment.line) {
            (Some(path), Some(line)) => {
                out.push_str(&format!(
                    "\n- @{} ({}:{}): {}",
                    comment.author, path, line, comment.body
                ));
            }
            (Some(path), None) => {
                out.push_str(&format!("\n- @{} ({}): {}", comment.author, path, comment.body));
            }
            _ => {
                out.push_str(&format!("\n- @{}: {}", comment.author, comment.body));
            }
        }
    }
    out.push_str(
        "\n\nAddress these comments only. Do not read or act on the rest of the PR thread.",
    );
    out
}

#[cfg(test)]
#[path = "reaction_tests.rs"]
mod tests;
