// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State classifier: maps plugin probes to the status a session should
//! hold now.
//!
//! Probe failures are swallowed: the classifier's contract is "best answer
//! from observable reality", and a broken probe must never coerce `stuck`
//! or `needs_input` back to `working`.

use crate::engine::LifecycleEngine;
use crate::metadata::{set, unset};
use fleet_core::session::meta;
use fleet_core::{
    AgentActivity, CiSummary, Clock, PrInfo, PrState, ProjectConfig, ReviewDecision, Session,
    SessionStatus,
};
use fleet_plugins::{AgentPlugin, RuntimePlugin, ScmPlugin};
use std::sync::Arc;

/// Lines of terminal output fetched for the agent probe.
const TERMINAL_PROBE_LINES: u32 = 10;

/// Codex renders a three-line rate-limit confirmation prompt; option 3 is
/// "Keep current model".
const CODEX_RATE_LIMIT_MARKERS: [&str; 3] =
    ["Approaching rate limits", "Switch to", "Press enter to confirm"];
const CODEX_KEEP_CURRENT_MODEL: &str = "3\n";

/// Classifier output: the status plus anything discovered along the way.
pub(crate) struct Classification {
    pub status: SessionStatus,
    /// PR adopted by auto-detection this cycle, to be carried into the
    /// transition router.
    pub detected_pr: Option<PrInfo>,
}

impl Classification {
    fn status(status: SessionStatus) -> Self {
        Self {
            status,
            detected_pr: None,
        }
    }
}

impl<C: Clock> LifecycleEngine<C> {
    pub(crate) async fn classify(
        &self,
        session: &Session,
        project: &ProjectConfig,
    ) -> Classification {
        let current = session.status;
        let runtime = project
            .runtime_name(&self.config.defaults)
            .and_then(|name| self.registry.runtime(name));
        let agent = project
            .agent_name(&self.config.defaults)
            .and_then(|name| self.registry.agent(name));

        // 1. Runtime liveness.
        if let (Some(handle), Some(rt)) = (&session.runtime_handle, &runtime) {
            match rt.is_alive(handle).await {
                Ok(false) => return Classification::status(SessionStatus::Killed),
                Ok(true) => {}
                Err(e) => {
                    tracing::debug!(session_id = %session.id, error = %e, "liveness probe failed");
                }
            }
        }

        // 2. Agent terminal probe.
        if let (Some(handle), Some(rt), Some(agent)) = (&session.runtime_handle, &runtime, &agent)
        {
            if let Some(outcome) = self.probe_agent(session, project, handle, rt, agent).await {
                return Classification::status(outcome);
            }
        }

        // 3. PR auto-detect.
        let mut detected_pr = None;
        let scm = project
            .scm
            .as_ref()
            .and_then(|r| self.registry.scm(&r.plugin));
        if session.pr.is_none() && session.branch.is_some() {
            if let Some(scm) = &scm {
                match scm.detect_pr(session, project).await {
                    Ok(Some(pr)) => {
                        if let Err(e) = self
                            .metadata
                            .update(&session.id, vec![set(meta::PR, pr.url.clone())])
                            .await
                        {
                            tracing::warn!(session_id = %session.id, error = %e, "pr metadata write failed");
                        }
                        detected_pr = Some(pr);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(session_id = %session.id, error = %e, "pr detection failed");
                    }
                }
            }
        }

        // 4. PR state.
        let pr = session.pr.as_ref().or(detected_pr.as_ref());
        if let (Some(pr), Some(scm)) = (pr, &scm) {
            if let Some(status) = self.classify_pr(pr, scm).await {
                return Classification {
                    status,
                    detected_pr,
                };
            }
        }

        // 5. Fallback: spawning/stuck/needs_input resolve to working once the
        // probes above stop reporting them; everything else holds.
        let status = match current {
            SessionStatus::Spawning | SessionStatus::Stuck | SessionStatus::NeedsInput => {
                SessionStatus::Working
            }
            other => other,
        };
        Classification {
            status,
            detected_pr,
        }
    }

    /// Terminal-output portion of the classifier. Returns `Some(status)` when
    /// the probe produced a concrete answer, `None` to fall through to the
    /// PR checks.
    async fn probe_agent(
        &self,
        session: &Session,
        project: &ProjectConfig,
        handle: &str,
        rt: &Arc<dyn RuntimePlugin>,
        agent: &Arc<dyn AgentPlugin>,
    ) -> Option<SessionStatus> {
        let current = session.status;
        let output = rt
            .get_output(handle, TERMINAL_PROBE_LINES)
            .await
            .unwrap_or_default();

        if output.trim().is_empty() {
            // Probe failure or blank pane: keep human-blocking statuses
            // rather than flapping them back to working.
            if matches!(current, SessionStatus::Stuck | SessionStatus::NeedsInput) {
                return Some(current);
            }
            return None;
        }

        if let Some(status) = self.stuck_recovery(session, project, &output).await {
            return Some(status);
        }

        let mut auto_dismissed = false;
        if agent.name() == "codex" && is_codex_rate_limit_prompt(&output) {
            if let Err(e) = rt.send_message(handle, CODEX_KEEP_CURRENT_MODEL).await {
                tracing::warn!(session_id = %session.id, error = %e, "codex prompt dismiss failed");
            } else {
                tracing::info!(session_id = %session.id, "dismissed codex rate-limit prompt");
                let now = self.now();
                if let Err(e) = self
                    .metadata
                    .update(
                        &session.id,
                        vec![
                            set(meta::CODEX_AUTODISMISS_CHOICE, "3"),
                            set(meta::CODEX_AUTODISMISS_AT, now.to_string()),
                        ],
                    )
                    .await
                {
                    tracing::warn!(session_id = %session.id, error = %e, "codex dismiss stamp failed");
                }
                auto_dismissed = true;
            }
        }

        let activity = agent.detect_activity(&output);
        if activity == AgentActivity::WaitingInput && !auto_dismissed {
            return Some(SessionStatus::NeedsInput);
        }

        // A dead process often leaves an "active"-looking shell prompt, so
        // the activity classification never overrides this check.
        match agent.is_process_running(handle).await {
            Ok(false) => return Some(SessionStatus::Killed),
            Ok(true) => {}
            Err(e) => {
                tracing::debug!(session_id = %session.id, error = %e, "process probe failed");
            }
        }

        None
    }

    /// Stuck-prompt recovery: a configured pattern sustained past the
    /// threshold gets the recovery message (at most once per cooldown) and
    /// classifies the session as stuck.
    async fn stuck_recovery(
        &self,
        session: &Session,
        project: &ProjectConfig,
        output: &str,
    ) -> Option<SessionStatus> {
        let config = &project.automation.stuck_recovery;
        if !config.enabled {
            return None;
        }
        let pattern = config.pattern.as_deref()?;
        let re = match regex::Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "invalid stuck-recovery pattern");
                return None;
            }
        };

        let now = self.now();
        if !re.is_match(output) {
            if session.meta(meta::STUCK_DETECTED_AT).is_some() {
                let _ = self
                    .metadata
                    .update(&session.id, vec![unset(meta::STUCK_DETECTED_AT)])
                    .await;
            }
            return None;
        }

        let detected_at = match session
            .meta(meta::STUCK_DETECTED_AT)
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(ts) => ts,
            None => {
                let _ = self
                    .metadata
                    .update(
                        &session.id,
                        vec![set(meta::STUCK_DETECTED_AT, now.to_string())],
                    )
                    .await;
                return None;
            }
        };

        if now.saturating_sub(detected_at) < config.threshold_sec * 1000 {
            return None;
        }

        let cooldown_ok = session
            .meta(meta::STUCK_RECOVERY_SENT_AT)
            .and_then(|v| v.parse::<u64>().ok())
            .is_none_or(|sent| now.saturating_sub(sent) >= config.cooldown_sec * 1000);
        if !cooldown_ok {
            return None;
        }

        let message = config
            .message
            .as_deref()
            .unwrap_or("Please continue with the task.");
        if let Err(e) = self.sessions.send(&session.id, message).await {
            tracing::warn!(session_id = %session.id, error = %e, "stuck recovery send failed");
        }
        let _ = self
            .metadata
            .update(
                &session.id,
                vec![set(meta::STUCK_RECOVERY_SENT_AT, now.to_string())],
            )
            .await;
        tracing::info!(session_id = %session.id, "stuck prompt sustained, recovery sent");
        Some(SessionStatus::Stuck)
    }

    /// PR-derived portion of the classifier. `None` means a probe failed and
    /// the fallback rule applies.
    async fn classify_pr(
        &self,
        pr: &PrInfo,
        scm: &Arc<dyn ScmPlugin>,
    ) -> Option<SessionStatus> {
        match scm.get_pr_state(pr).await {
            Ok(PrState::Merged) => return Some(SessionStatus::Merged),
            Ok(PrState::Closed) => return Some(SessionStatus::Killed),
            Ok(PrState::Open) | Ok(PrState::Unknown) => {}
            Err(e) => {
                tracing::debug!(pr = pr.number, error = %e, "pr state probe failed");
                return None;
            }
        }

        match scm.get_ci_summary(pr).await {
            Ok(CiSummary::Failing) => return Some(SessionStatus::CiFailed),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(pr = pr.number, error = %e, "ci probe failed");
                return None;
            }
        }

        let decision = if self.config.allowed_users.is_empty() {
            scm.get_review_decision(pr).await
        } else {
            self.filtered_review_decision(pr, scm).await
        };

        match decision {
            Ok(ReviewDecision::ChangesRequested) => Some(SessionStatus::ChangesRequested),
            Ok(ReviewDecision::Approved) => match scm.get_mergeability(pr).await {
                Ok(m) if m.mergeable => Some(SessionStatus::Mergeable),
                Ok(_) => Some(SessionStatus::Approved),
                Err(e) => {
                    tracing::debug!(pr = pr.number, error = %e, "mergeability probe failed");
                    Some(SessionStatus::Approved)
                }
            },
            Ok(ReviewDecision::Pending) => Some(SessionStatus::ReviewPending),
            Ok(ReviewDecision::None) => Some(SessionStatus::PrOpen),
            Err(e) => {
                tracing::debug!(pr = pr.number, error = %e, "review probe failed");
                None
            }
        }
    }
}

/// The codex rate-limit prompt shows three lines; all must be present.
fn is_codex_rate_limit_prompt(output: &str) -> bool {
    CODEX_RATE_LIMIT_MARKERS.iter().all(|m| output.contains(m))
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
