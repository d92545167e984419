// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transition router: on a status change, persist the new status, clear the
//! old status's reaction trackers, and dispatch the configured reactions.

use crate::engine::LifecycleEngine;
use crate::metadata::set;
use crate::reaction::ReactionContext;
use fleet_core::reaction::keys;
use fleet_core::session::meta;
use fleet_core::{
    Clock, EventType, OrchestratorEvent, Priority, ProjectConfig, Session, SessionStatus,
};

/// Fixed table: status entered → (event type, reaction keys).
pub(crate) fn route(status: SessionStatus) -> Option<(EventType, &'static [&'static str])> {
    match status {
        SessionStatus::Working => Some((EventType::SessionWorking, &[])),
        SessionStatus::PrOpen => Some((EventType::PrCreated, &[keys::ISSUE_PROGRESS_PR_OPENED])),
        SessionStatus::CiFailed => Some((EventType::CiFailing, &[keys::CI_FAILED])),
        SessionStatus::ReviewPending => Some((
            EventType::ReviewPending,
            &[keys::AUTO_REVIEW, keys::ISSUE_PROGRESS_REVIEW_UPDATED],
        )),
        SessionStatus::ChangesRequested => Some((
            EventType::ReviewChangesRequested,
            &[keys::CHANGES_REQUESTED, keys::ISSUE_PROGRESS_REVIEW_UPDATED],
        )),
        SessionStatus::Approved => Some((
            EventType::ReviewApproved,
            &[keys::ISSUE_PROGRESS_REVIEW_UPDATED],
        )),
        SessionStatus::Mergeable => Some((
            EventType::MergeReady,
            &[keys::APPROVED_AND_GREEN, keys::ISSUE_PROGRESS_REVIEW_UPDATED],
        )),
        SessionStatus::Merged => Some((EventType::MergeCompleted, &[keys::ISSUE_COMPLETED])),
        SessionStatus::NeedsInput => {
            Some((EventType::SessionNeedsInput, &[keys::AGENT_NEEDS_INPUT]))
        }
        SessionStatus::Stuck => Some((EventType::SessionStuck, &[keys::AGENT_STUCK])),
        SessionStatus::Killed => Some((EventType::SessionKilled, &[keys::AGENT_EXITED])),
        SessionStatus::Errored => Some((EventType::SessionErrored, &[])),
        SessionStatus::Spawning => None,
    }
}

impl<C: Clock> LifecycleEngine<C> {
    /// Handle `old_status → new_status`. All failures are contained here:
    /// a failing reaction never aborts the rest of the session's cycle.
    pub(crate) async fn handle_transition(
        &self,
        session: &Session,
        project: &ProjectConfig,
        old_status: SessionStatus,
        new_status: SessionStatus,
    ) {
        tracing::info!(
            session_id = %session.id,
            old = %old_status,
            new = %new_status,
            "session status changed"
        );

        // 1. Persist through the metadata port.
        if let Err(e) = self
            .metadata
            .update(&session.id, vec![set(meta::STATUS, new_status.as_str())])
            .await
        {
            tracing::warn!(session_id = %session.id, error = %e, "status persist failed");
        }

        {
            let mut state = self.state.lock();
            // 2. Leaving the all-terminal plateau re-arms the summary event.
            if !new_status.is_terminal() {
                state.all_complete_emitted = false;
            }
            // 3. Reaction trackers belong to the status that spawned them.
            if let Some((_, old_keys)) = route(old_status) {
                for key in old_keys {
                    state
                        .reaction_trackers
                        .remove(&(session.id.clone(), key.to_string()));
                }
            }
        }

        // 4. Event + reaction keys for the new status.
        let Some((event_type, reaction_keys)) = route(new_status) else {
            return;
        };
        let event = OrchestratorEvent::new(
            event_type,
            self.now(),
            format!(
                "Session {} is now {} (was {})",
                session.id, new_status, old_status
            ),
        )
        .for_session(session.id.clone(), session.project_id.clone())
        .with_data(serde_json::json!({
            "old_status": old_status.as_str(),
            "new_status": new_status.as_str(),
            "pr": session.pr.as_ref().map(|pr| pr.url.clone()),
        }));

        // 5. Run each configured reaction; any that runs handles the event.
        let mut handled = false;
        for key in reaction_keys {
            let Some(config) = self.config.reaction(session.project_id.as_str(), key) else {
                continue;
            };
            if !config.should_run() {
                continue;
            }
            let ctx = ReactionContext {
                session,
                project,
                event: &event,
                key,
            };
            let outcome = self.execute_reaction(&ctx, &config).await;
            tracing::debug!(
                session_id = %session.id,
                reaction = key,
                success = outcome.success,
                escalated = outcome.escalated,
                "reaction finished"
            );
            handled |= outcome.handled;
        }

        // 6. Unhandled, non-info events still reach a human.
        if !handled && event.priority != Priority::Info {
            let priority = event.priority;
            self.notify_human(&event, priority).await;
        }
    }
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;
