// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Comment watcher: per-session tracker-comment delta detection.

use crate::engine::LifecycleEngine;
use crate::reaction::ReactionContext;
use fleet_core::reaction::keys;
use fleet_core::{
    Clock, EventType, IssueComment, OrchestratorEvent, ProjectConfig, ReactionAction, Session,
};

impl<C: Clock> LifecycleEngine<C> {
    /// Detect new issue comments for a session and run the
    /// `issue-commented` reaction over them. Failures are contained.
    pub(crate) async fn watch_comments(&self, session: &Session, project: &ProjectConfig) {
        let Some(issue_id) = session.issue_id.clone() else {
            return;
        };
        let Some(tracker) = project
            .tracker
            .as_ref()
            .and_then(|r| self.registry.tracker(&r.plugin))
        else {
            return;
        };
        let Some(config) = self
            .config
            .reaction(session.project_id.as_str(), keys::ISSUE_COMMENTED)
        else {
            return;
        };
        if !config.should_run() {
            return;
        }

        // Optional labels filter: the issue must carry one of them.
        let labels = config
            .filter
            .as_ref()
            .map(|f| f.labels.clone())
            .unwrap_or_default();
        if !labels.is_empty() {
            match tracker.get_issue(&issue_id, project).await {
                Ok(issue) => {
                    if !issue.labels.iter().any(|l| labels.contains(l)) {
                        return;
                    }
                }
                Err(e) => {
                    tracing::debug!(issue = %issue_id, error = %e, "label check failed");
                    return;
                }
            }
        }

        let now = self.now();
        // First observation: skip the issue's comment history.
        let since = {
            let mut state = self.state.lock();
            match state.last_comment_timestamps.get(&session.id) {
                Some(ts) => *ts,
                None => {
                    state.last_comment_timestamps.insert(session.id.clone(), now);
                    return;
                }
            }
        };

        let comments = match tracker.get_issue_comments(&issue_id, project, since).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::debug!(issue = %issue_id, error = %e, "comment fetch failed");
                return;
            }
        };
        if comments.is_empty() {
            return;
        }

        // Advance the high-water mark past everything fetched, even when the
        // author filter drops it all; the same comments must not resurface.
        if let Some(newest) = comments.iter().map(|c| c.created_at).max() {
            self.state
                .lock()
                .last_comment_timestamps
                .insert(session.id.clone(), newest);
        }

        let authors = config
            .filter
            .as_ref()
            .map(|f| f.authors.clone())
            .unwrap_or_default();
        let remaining: Vec<IssueComment> = comments
            .into_iter()
            .filter(|c| authors.is_empty() || authors.contains(&c.author))
            .collect();
        if remaining.is_empty() {
            return;
        }

        let block = format_comment_block(&remaining);
        let event = OrchestratorEvent::new(
            EventType::IssueCommentAdded,
            now,
            format!(
                "{} new comment(s) on issue {} for session {}",
                remaining.len(),
                issue_id,
                session.id
            ),
        )
        .for_session(session.id.clone(), session.project_id.clone())
        .with_data(serde_json::json!({
            "issue": issue_id.as_str(),
            "authors": remaining.iter().map(|c| c.author.clone()).collect::<Vec<_>>(),
        }));

        // send-to-agent gets the comments prepended to its message.
        let mut config = config;
        if config.action == ReactionAction::SendToAgent {
            let base = config
                .message
                .clone()
                .unwrap_or_else(|| crate::reaction::default_message(keys::ISSUE_COMMENTED).to_string());
            config.message = Some(format!("{}\n\n{}", block, base));
        }

        let ctx = ReactionContext {
            session,
            project,
            event: &event,
            key: keys::ISSUE_COMMENTED,
        };
        let outcome = self.execute_reaction(&ctx, &config).await;
        tracing::debug!(
            session_id = %session.id,
            issue = %issue_id,
            success = outcome.success,
            "issue-commented reaction finished"
        );
    }
}

/// `**@author** commented:` blocks separated by `---`.
fn format_comment_block(comments: &[IssueComment]) -> String {
    comments
        .iter()
        .map(|c| format!("**@{}** commented:\n{}", c.author, c.body))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
#[path = "comments_tests.rs"]
mod tests;
