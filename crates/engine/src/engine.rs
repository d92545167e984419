// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lifecycle engine facade: interval driver, poll cycle, and
//! engine-private state.

use crate::metadata::MetadataStore;
use crate::EngineError;
use fleet_core::{
    Clock, EventType, OrchestratorEvent, ProjectConfig, ProjectId, Session, SessionId,
    SessionStatus, OrchestratorConfig, ReactionTracker,
};
use fleet_plugins::{PluginRegistry, SessionManager};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// External collaborators the engine is wired with.
pub struct EngineDeps {
    pub registry: PluginRegistry,
    pub sessions: Arc<dyn SessionManager>,
    pub metadata: Arc<dyn MetadataStore>,
}

/// Engine-private bookkeeping. Mutated only under short lock scopes with no
/// plugin call in between.
#[derive(Default)]
pub(crate) struct EngineState {
    /// Last classified status per live session.
    pub states: HashMap<SessionId, SessionStatus>,
    /// Attempt accounting per `(session, reaction key)`.
    pub reaction_trackers: HashMap<(SessionId, String), ReactionTracker>,
    /// Auto-merge retry backoff, epoch ms.
    pub merge_retry_cooldown_until: HashMap<SessionId, u64>,
    /// Queue-pickup throttle per project, epoch ms.
    pub queue_pickup_last_run: HashMap<ProjectId, u64>,
    /// Comment watcher per-session high-water mark, epoch ms.
    pub last_comment_timestamps: HashMap<SessionId, u64>,
    /// Poll cycles since start; drives the external-PR scan cadence.
    pub pr_scan_counter: u64,
    /// Edge detector for the all-sessions-complete summary event.
    pub all_complete_emitted: bool,
}

/// The lifecycle engine. Shared as `Arc<LifecycleEngine<C>>`; the interval
/// task, `check()` calls, and fanned-out session checks all run against the
/// same instance.
pub struct LifecycleEngine<C: Clock> {
    pub(crate) config: OrchestratorConfig,
    pub(crate) registry: PluginRegistry,
    pub(crate) sessions: Arc<dyn SessionManager>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
    pub(crate) clock: C,
    pub(crate) state: Mutex<EngineState>,
    /// Re-entrancy guard: a tick that fires while a cycle is in flight is
    /// dropped silently.
    polling: AtomicBool,
    cancel: CancellationToken,
    poll_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<C: Clock> LifecycleEngine<C> {
    pub fn new(config: OrchestratorConfig, deps: EngineDeps, clock: C) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: deps.registry,
            sessions: deps.sessions,
            metadata: deps.metadata,
            clock,
            state: Mutex::new(EngineState::default()),
            polling: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            poll_task: Mutex::new(None),
        })
    }

    pub(crate) fn now(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub(crate) fn project(&self, id: &ProjectId) -> Option<&ProjectConfig> {
        self.config.projects.get(id.as_str())
    }

    /// Start the interval driver. One cycle at a time; the next tick waits
    /// for the previous cycle to finish and overlapping ticks are dropped by
    /// the polling guard.
    pub fn start(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let period = Duration::from_millis(engine.config.interval_ms.max(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of tokio's interval fires immediately.
            loop {
                tokio::select! {
                    _ = engine.cancel.cancelled() => break,
                    _ = interval.tick() => {
                        engine.poll_all().await;
                    }
                }
            }
            tracing::info!("poll loop stopped");
        });
        *self.poll_task.lock() = Some(handle);
    }

    /// Stop the interval driver and drain the in-flight cycle.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.poll_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "poll task join failed");
            }
        }
    }

    /// Snapshot of the in-memory status map.
    pub fn states(&self) -> HashMap<SessionId, SessionStatus> {
        self.state.lock().states.clone()
    }

    /// Run one poll cycle now. No-op if a cycle is already in flight.
    pub async fn poll_all(self: &Arc<Self>) {
        if self
            .polling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("poll tick dropped: cycle already in flight");
            return;
        }
        if let Err(e) = self.poll_cycle().await {
            // Cycle failures never take the loop down; next tick retries.
            tracing::error!(error = %e, "poll cycle failed");
        }
        self.polling.store(false, Ordering::SeqCst);
    }

    /// Force-poll a single session, bypassing the re-entrancy guard.
    /// Shares the cycle's code path; useful for tests and CLI tooling.
    pub async fn check(&self, id: &SessionId) -> Result<(), EngineError> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(id.to_string()))?;
        self.check_session(&session).await
    }

    async fn poll_cycle(self: &Arc<Self>) -> Result<(), EngineError> {
        let cycle = {
            let mut state = self.state.lock();
            state.pr_scan_counter += 1;
            state.pr_scan_counter
        };

        // External-PR adoption runs strictly before queue pickup on scan
        // cycles, and pickup strictly before the session fanout, so freshly
        // admitted work is visible to the next cycle rather than half of
        // this one.
        let sessions = self.sessions.list(None).await?;

        let scan_every = self.config.pr_scan_every.max(1);
        if cycle % scan_every == 0 && !self.config.allowed_users.is_empty() {
            self.scan_external_prs(&sessions).await;
        }

        self.run_queue_pickup(&sessions).await;

        let cancel = self.cancel.child_token();
        let mut tasks: JoinSet<()> = JoinSet::new();
        for session in sessions.iter().cloned() {
            let engine = Arc::clone(self);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    result = engine.check_session(&session) => {
                        if let Err(e) = result {
                            tracing::warn!(
                                session_id = %session.id,
                                error = %e,
                                "session check failed"
                            );
                        }
                    }
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "session check task panicked");
            }
        }

        self.prune_stale(&sessions);
        self.detect_all_complete(&sessions).await;
        Ok(())
    }

    /// Classifier → transition router → comment watcher for one session.
    pub(crate) async fn check_session(&self, session: &Session) -> Result<(), EngineError> {
        let Some(project) = self.project(&session.project_id) else {
            tracing::debug!(
                session_id = %session.id,
                project_id = %session.project_id,
                "session belongs to an unconfigured project, skipping"
            );
            return Ok(());
        };

        // Overlay the in-memory status: the snapshot's persisted status can
        // lag by a cycle, and the in-memory map is authoritative mid-run.
        let mut session = session.clone();
        let old_status = {
            let state = self.state.lock();
            state.states.get(&session.id).copied()
        }
        .unwrap_or(session.status);
        session.status = old_status;

        let classification = self.classify(&session, project).await;
        if let Some(pr) = classification.detected_pr {
            session.pr = Some(pr);
        }
        let new_status = classification.status;

        self.state
            .lock()
            .states
            .insert(session.id.clone(), new_status);

        if new_status != old_status {
            session.status = new_status;
            self.handle_transition(&session, project, old_status, new_status)
                .await;
        }

        self.watch_comments(&session, project).await;
        Ok(())
    }

    /// Drop bookkeeping for sessions no longer listed by the manager.
    fn prune_stale(&self, sessions: &[Session]) {
        let live: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        let mut state = self.state.lock();
        state.states.retain(|id, _| live.contains(id.as_str()));
        state
            .reaction_trackers
            .retain(|(id, _), _| live.contains(id.as_str()));
        state
            .merge_retry_cooldown_until
            .retain(|id, _| live.contains(id.as_str()));
        state
            .last_comment_timestamps
            .retain(|id, _| live.contains(id.as_str()));
    }

    /// Emit the all-complete summary exactly once per completion edge.
    async fn detect_all_complete(&self, sessions: &[Session]) {
        let (all_terminal, already_emitted) = {
            let state = self.state.lock();
            let all_terminal = !sessions.is_empty()
                && sessions.iter().all(|s| {
                    state
                        .states
                        .get(&s.id)
                        .copied()
                        .unwrap_or(s.status)
                        .is_terminal()
                });
            (all_terminal, state.all_complete_emitted)
        };

        if !all_terminal {
            self.state.lock().all_complete_emitted = false;
            return;
        }
        if already_emitted {
            return;
        }
        self.state.lock().all_complete_emitted = true;

        let event = OrchestratorEvent::new(
            EventType::AllSessionsComplete,
            self.now(),
            format!("All {} session(s) have completed", sessions.len()),
        );
        let priority = event.priority;
        self.notify_human(&event, priority).await;
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
