// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue pickup: admit tracker issues in the pickup state as new sessions,
//! bounded per cycle and per project.

use crate::engine::LifecycleEngine;
use fleet_core::{Clock, Issue, IssueFilters, IssueUpdate, ProjectConfig, ProjectId, Session};
use fleet_plugins::{SpawnRequest, TrackerPlugin};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::OnceLock;

/// Issues are eligible when the description carries an `AO_META` block that
/// reached `pipeline=queued`. Up to ~2 KB of other metadata may sit between
/// the two markers.
#[allow(clippy::unwrap_used)] // literal pattern
fn ao_meta_queued() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"AO_META[\s\S]{0,2048}?pipeline\s*=\s*queued").unwrap())
}

impl<C: Clock> LifecycleEngine<C> {
    /// Run pickup for every project due this cycle. Failures are contained
    /// per project.
    pub(crate) async fn run_queue_pickup(&self, sessions: &[Session]) {
        for (project_id, project) in &self.config.projects {
            if !project.automation.queue_pickup.enabled {
                continue;
            }
            let Some(tracker) = project
                .tracker
                .as_ref()
                .and_then(|r| self.registry.tracker(&r.plugin))
            else {
                continue;
            };

            let project_id = ProjectId::new(project_id.as_str());
            let now = self.now();
            let due = {
                let state = self.state.lock();
                state
                    .queue_pickup_last_run
                    .get(&project_id)
                    .is_none_or(|last| {
                        now.saturating_sub(*last)
                            >= project.automation.queue_pickup.interval_sec * 1000
                    })
            };
            if !due {
                continue;
            }
            self.state
                .lock()
                .queue_pickup_last_run
                .insert(project_id.clone(), now);

            self.pickup_project(&project_id, project, &tracker, sessions)
                .await;
        }
    }

    async fn pickup_project(
        &self,
        project_id: &ProjectId,
        project: &ProjectConfig,
        tracker: &Arc<dyn TrackerPlugin>,
        sessions: &[Session],
    ) {
        let pickup = &project.automation.queue_pickup;
        let filters = IssueFilters {
            state: Some("open".to_string()),
            workflow_state_name: Some(pickup.pickup_state_name.clone()),
            limit: Some(100),
        };
        let issues = match tracker.list_issues(&filters, project).await {
            Ok(issues) => issues,
            Err(e) => {
                tracing::warn!(project = %project_id, error = %e, "issue listing failed");
                return;
            }
        };

        // Live work in this project, with the in-memory status overlaid.
        let mut active: usize = 0;
        let mut taken_issues: Vec<String> = Vec::new();
        {
            let state = self.state.lock();
            for session in sessions.iter().filter(|s| &s.project_id == project_id) {
                let status = state
                    .states
                    .get(&session.id)
                    .copied()
                    .unwrap_or(session.status);
                if !status.is_terminal() {
                    active += 1;
                    if let Some(issue) = &session.issue_id {
                        taken_issues.push(issue.to_string());
                    }
                }
            }
        }

        let mut spawned_this_cycle = 0;
        for issue in issues {
            if taken_issues.iter().any(|taken| taken == issue.id.as_str()) {
                continue;
            }
            if pickup.require_ao_meta_queued && !ao_meta_queued().is_match(&issue.description) {
                tracing::debug!(issue = %issue.id, "skipping: no queued pipeline marker");
                continue;
            }
            if spawned_this_cycle >= pickup.max_spawn_per_cycle {
                tracing::debug!(project = %project_id, "spawn cap reached for this cycle");
                break;
            }
            if active >= pickup.max_active_sessions {
                tracing::debug!(project = %project_id, "active session cap reached");
                break;
            }

            if self.spawn_for_issue(project_id, project, &issue).await {
                spawned_this_cycle += 1;
                active += 1;
                taken_issues.push(issue.id.to_string());

                if let Some(next_state) = &pickup.transition_state_name {
                    let update = IssueUpdate {
                        workflow_state_name: Some(next_state.clone()),
                        ..IssueUpdate::default()
                    };
                    if let Err(e) = tracker.update_issue(&issue.id, &update, project).await {
                        tracing::warn!(issue = %issue.id, error = %e, "pickup transition failed");
                    }
                }
            }
        }
    }

    /// Spawn a session for an issue, with one destroy-and-retry when the
    /// failure names an abandoned worktree the engine manages.
    async fn spawn_for_issue(
        &self,
        project_id: &ProjectId,
        _project: &ProjectConfig,
        issue: &Issue,
    ) -> bool {
        let request = SpawnRequest {
            project_id: project_id.clone(),
            issue_id: Some(issue.id.clone()),
        };
        let error = match self.sessions.spawn(&request).await {
            Ok(session) => {
                tracing::info!(session_id = %session.id, issue = %issue.id, "session spawned");
                return true;
            }
            Err(e) => e.to_string(),
        };

        let Some(worktree) = self.reclaimable_worktree(project_id, &error) else {
            tracing::warn!(issue = %issue.id, error = %error, "spawn failed");
            return false;
        };

        tracing::info!(
            worktree = %worktree.display(),
            issue = %issue.id,
            "removing abandoned worktree and retrying spawn"
        );
        if let Err(e) = std::fs::remove_dir_all(&worktree) {
            tracing::warn!(worktree = %worktree.display(), error = %e, "worktree removal failed");
            return false;
        }

        match self.sessions.spawn(&request).await {
            Ok(session) => {
                tracing::info!(session_id = %session.id, issue = %issue.id, "session spawned on retry");
                true
            }
            Err(e) => {
                tracing::warn!(issue = %issue.id, error = %e, "spawn retry failed");
                false
            }
        }
    }

    /// A worktree path named in a spawn error that is safe to reclaim: it
    /// lives under the engine-managed root for this project, and no live
    /// session owns it.
    fn reclaimable_worktree(&self, project_id: &ProjectId, error: &str) -> Option<PathBuf> {
        let root = worktree_root()?.join(project_id.as_str());
        let path = extract_path_under(error, &root)?;

        // The worktree leaf is the owning session's id by convention.
        let owner = path.file_name()?.to_str()?.to_string();
        let state = self.state.lock();
        let live = state
            .states
            .get(owner.as_str())
            .map(|status| !status.is_terminal())
            .unwrap_or(false);
        if live {
            return None;
        }
        Some(path)
    }
}

/// Engine-managed worktree root: `~/.worktrees`.
fn worktree_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".worktrees"))
}

/// Find a path in `text` that starts with `root`, ending at whitespace or a
/// quote.
fn extract_path_under(text: &str, root: &Path) -> Option<PathBuf> {
    let root_str = root.to_str()?;
    let start = text.find(root_str)?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ')')
        .unwrap_or(rest.len());
    Some(PathBuf::from(&rest[..end]))
}

#[cfg(test)]
#[path = "pickup_tests.rs"]
mod tests;
