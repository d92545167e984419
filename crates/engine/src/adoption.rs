// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trusted-reviewer filtering and external PR adoption.
//!
//! With `allowed_users` configured, review decisions are folded from the
//! trusted reviewers' latest reviews only, and every Nth cycle the engine
//! scans for open PRs by trusted authors that no session tracks, adopting
//! them as runtime-less sessions.

use crate::engine::LifecycleEngine;
use crate::metadata::set;
use fleet_core::session::meta;
use fleet_core::{
    Clock, PrInfo, PrReview, ProjectId, ReviewDecision, ReviewState, Session, SessionId,
};
use fleet_plugins::{PluginError, ScmPlugin};
use std::collections::HashMap;
use std::sync::Arc;

/// Fold reviews into a decision: latest review per author wins, only
/// trusted authors count, and changes-requested outranks everything.
pub(crate) fn fold_review_decision(reviews: &[PrReview], allowed: &[String]) -> ReviewDecision {
    let mut latest: HashMap<&str, &PrReview> = HashMap::new();
    for review in reviews {
        if !allowed.is_empty() && !allowed.iter().any(|a| a == &review.author) {
            continue;
        }
        match latest.get(review.author.as_str()) {
            Some(existing) if existing.submitted_at > review.submitted_at => {}
            _ => {
                latest.insert(&review.author, review);
            }
        }
    }

    let states: Vec<ReviewState> = latest
        .values()
        .map(|r| r.state)
        .filter(|s| *s != ReviewState::Dismissed)
        .collect();

    if states.is_empty() {
        return ReviewDecision::None;
    }
    if states.contains(&ReviewState::ChangesRequested) {
        return ReviewDecision::ChangesRequested;
    }
    if states.iter().all(|s| *s == ReviewState::Approved) {
        return ReviewDecision::Approved;
    }
    if states
        .iter()
        .any(|s| matches!(s, ReviewState::Pending | ReviewState::Commented))
    {
        return ReviewDecision::Pending;
    }
    ReviewDecision::None
}

impl<C: Clock> LifecycleEngine<C> {
    /// Review decision restricted to `allowed_users`.
    pub(crate) async fn filtered_review_decision(
        &self,
        pr: &PrInfo,
        scm: &Arc<dyn ScmPlugin>,
    ) -> Result<ReviewDecision, PluginError> {
        let reviews = scm.get_reviews(pr).await?;
        Ok(fold_review_decision(&reviews, &self.config.allowed_users))
    }

    /// Scan every project's SCM for open PRs by trusted authors that no
    /// session tracks, and adopt them by writing sidecar metadata under a
    /// freshly reserved session id. The session manager surfaces adopted
    /// sessions on its next listing.
    pub(crate) async fn scan_external_prs(&self, sessions: &[Session]) {
        for (project_id, project) in &self.config.projects {
            let Some(scm) = project
                .scm
                .as_ref()
                .and_then(|r| self.registry.scm(&r.plugin))
            else {
                continue;
            };
            if !scm.supports_pr_listing() {
                continue;
            }

            let prs = match scm.list_open_prs(project).await {
                Ok(prs) => prs,
                Err(e) => {
                    tracing::debug!(project = %project_id, error = %e, "pr listing failed");
                    continue;
                }
            };

            let project_id = ProjectId::new(project_id.as_str());
            let project_sessions: Vec<&Session> = sessions
                .iter()
                .filter(|s| s.project_id == project_id)
                .collect();

            let mut next_seq = project_sessions
                .iter()
                .filter_map(|s| s.id.sequence(&project.session_prefix))
                .max()
                .unwrap_or(0);

            for pr in prs {
                let trusted = pr
                    .author
                    .as_ref()
                    .is_some_and(|a| self.config.allowed_users.contains(a));
                if !trusted {
                    continue;
                }
                let tracked = project_sessions.iter().any(|s| {
                    s.pr.as_ref().is_some_and(|p| p.number == pr.number)
                        || s.branch.as_deref() == Some(pr.branch.as_str())
                });
                if tracked {
                    continue;
                }

                next_seq += 1;
                let id = SessionId::numbered(&project.session_prefix, next_seq);
                let patch = vec![
                    set(meta::BRANCH, pr.branch.clone()),
                    set(meta::STATUS, "pr_open"),
                    set(meta::PR, pr.url.clone()),
                    set(meta::ADOPTED, "true"),
                ];
                match self.metadata.update(&id, patch).await {
                    Ok(()) => {
                        tracing::info!(
                            session_id = %id,
                            pr = pr.number,
                            author = pr.author.as_deref().unwrap_or(""),
                            "adopted external pr"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(pr = pr.number, error = %e, "pr adoption failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "adoption_tests.rs"]
mod tests;
