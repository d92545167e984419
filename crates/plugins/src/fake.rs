// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorded-call fake plugins for testing.
//!
//! Every fake is cheaply cloneable (shared `Arc<Mutex<_>>` state), records
//! the calls made against it, and lets tests script probe results per
//! handle / PR / issue.
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{
    AgentPlugin, NotifierPlugin, PluginError, RuntimePlugin, ScmPlugin, SessionManager,
    SpawnRequest, TrackerPlugin,
};
use async_trait::async_trait;
use fleet_core::{
    AgentActivity, CiCheck, CiSummary, Issue, IssueComment, IssueFilters, IssueId, IssueUpdate,
    Mergeability, MergeMethod, OrchestratorEvent, PrComment, PrInfo, PrReview, PrState,
    ProjectConfig, ProjectId, ReviewDecision, Session, SessionId, SessionStatus,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Recorded runtime call
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    IsAlive { handle: String },
    GetOutput { handle: String, lines: u32 },
    SendMessage { handle: String, text: String },
    Destroy { handle: String },
}

#[derive(Default)]
struct FakeRuntimeState {
    alive: HashMap<String, bool>,
    output: HashMap<String, String>,
    failing_output: HashMap<String, bool>,
    calls: Vec<RuntimeCall>,
}

/// Fake runtime plugin with scriptable liveness and terminal output.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeRuntimeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live handle with empty output.
    pub fn add_handle(&self, handle: &str) {
        let mut inner = self.inner.lock();
        inner.alive.insert(handle.to_string(), true);
        inner.output.insert(handle.to_string(), String::new());
    }

    pub fn set_alive(&self, handle: &str, alive: bool) {
        self.inner.lock().alive.insert(handle.to_string(), alive);
    }

    pub fn set_output(&self, handle: &str, output: &str) {
        self.inner
            .lock()
            .output
            .insert(handle.to_string(), output.to_string());
    }

    /// Make `get_output` fail for this handle (probe failure).
    pub fn fail_output(&self, handle: &str) {
        self.inner
            .lock()
            .failing_output
            .insert(handle.to_string(), true);
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.inner.lock().calls.clone()
    }

    /// Messages sent via `send_message`, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RuntimeCall::SendMessage { handle, text } => {
                    Some((handle.clone(), text.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RuntimePlugin for FakeRuntime {
    async fn is_alive(&self, handle: &str) -> Result<bool, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::IsAlive {
            handle: handle.to_string(),
        });
        Ok(inner.alive.get(handle).copied().unwrap_or(false))
    }

    async fn get_output(&self, handle: &str, lines: u32) -> Result<String, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::GetOutput {
            handle: handle.to_string(),
            lines,
        });
        if inner.failing_output.get(handle).copied().unwrap_or(false) {
            return Err(PluginError::OperationFailed("capture failed".to_string()));
        }
        Ok(inner.output.get(handle).cloned().unwrap_or_default())
    }

    async fn send_message(&self, handle: &str, text: &str) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::SendMessage {
            handle: handle.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn destroy(&self, handle: &str) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Destroy {
            handle: handle.to_string(),
        });
        inner.alive.insert(handle.to_string(), false);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeAgentState {
    activity: Option<AgentActivity>,
    process_running: HashMap<String, bool>,
    summary: Option<String>,
}

/// Fake agent plugin with a fixed activity classification.
#[derive(Clone)]
pub struct FakeAgent {
    name: String,
    inner: Arc<Mutex<FakeAgentState>>,
}

impl Default for FakeAgent {
    fn default() -> Self {
        Self::named("claude")
    }
}

impl FakeAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(FakeAgentState::default())),
        }
    }

    /// Fixed classification for any terminal output.
    pub fn set_activity(&self, activity: AgentActivity) {
        self.inner.lock().activity = Some(activity);
    }

    pub fn set_process_running(&self, handle: &str, running: bool) {
        self.inner
            .lock()
            .process_running
            .insert(handle.to_string(), running);
    }

    pub fn set_summary(&self, summary: &str) {
        self.inner.lock().summary = Some(summary.to_string());
    }
}

#[async_trait]
impl AgentPlugin for FakeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect_activity(&self, _terminal_output: &str) -> AgentActivity {
        self.inner.lock().activity.unwrap_or(AgentActivity::Active)
    }

    async fn is_process_running(&self, handle: &str) -> Result<bool, PluginError> {
        Ok(self
            .inner
            .lock()
            .process_running
            .get(handle)
            .copied()
            .unwrap_or(true))
    }

    async fn session_summary(&self, _session: &Session) -> Result<Option<String>, PluginError> {
        Ok(self.inner.lock().summary.clone())
    }
}

// ---------------------------------------------------------------------------
// SCM
// ---------------------------------------------------------------------------

/// Recorded SCM call
#[derive(Debug, Clone, PartialEq)]
pub enum ScmCall {
    DetectPr { session: SessionId },
    MergePr { number: u64, method: MergeMethod },
    ListOpenPrs,
}

struct FakeScmState {
    detect_result: Option<PrInfo>,
    pr_state: PrState,
    ci_summary: CiSummary,
    ci_checks: Vec<CiCheck>,
    reviews: Vec<PrReview>,
    review_decision: ReviewDecision,
    review_requests: usize,
    pending_comments: Vec<PrComment>,
    mergeability: Mergeability,
    merge_error: Option<String>,
    open_prs: Vec<PrInfo>,
    supports_listing: bool,
    calls: Vec<ScmCall>,
}

impl Default for FakeScmState {
    fn default() -> Self {
        Self {
            detect_result: None,
            pr_state: PrState::Open,
            ci_summary: CiSummary::None,
            ci_checks: Vec::new(),
            reviews: Vec::new(),
            review_decision: ReviewDecision::None,
            review_requests: 0,
            pending_comments: Vec::new(),
            mergeability: Mergeability {
                mergeable: true,
                blockers: Vec::new(),
            },
            merge_error: None,
            open_prs: Vec::new(),
            supports_listing: false,
            calls: Vec::new(),
        }
    }
}

/// Fake SCM plugin with scriptable PR/CI/review probes.
#[derive(Clone, Default)]
pub struct FakeScm {
    inner: Arc<Mutex<FakeScmState>>,
}

impl FakeScm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_detect_result(&self, pr: Option<PrInfo>) {
        self.inner.lock().detect_result = pr;
    }

    pub fn set_pr_state(&self, state: PrState) {
        self.inner.lock().pr_state = state;
    }

    pub fn set_ci_summary(&self, summary: CiSummary) {
        self.inner.lock().ci_summary = summary;
    }

    pub fn set_ci_checks(&self, checks: Vec<CiCheck>) {
        self.inner.lock().ci_checks = checks;
    }

    pub fn set_reviews(&self, reviews: Vec<PrReview>) {
        self.inner.lock().reviews = reviews;
    }

    pub fn set_review_decision(&self, decision: ReviewDecision) {
        self.inner.lock().review_decision = decision;
    }

    pub fn set_review_requests(&self, count: usize) {
        self.inner.lock().review_requests = count;
    }

    pub fn set_pending_comments(&self, comments: Vec<PrComment>) {
        self.inner.lock().pending_comments = comments;
    }

    pub fn set_mergeability(&self, mergeability: Mergeability) {
        self.inner.lock().mergeability = mergeability;
    }

    pub fn fail_merge(&self, message: &str) {
        self.inner.lock().merge_error = Some(message.to_string());
    }

    pub fn set_open_prs(&self, prs: Vec<PrInfo>) {
        let mut inner = self.inner.lock();
        inner.open_prs = prs;
        inner.supports_listing = true;
    }

    pub fn calls(&self) -> Vec<ScmCall> {
        self.inner.lock().calls.clone()
    }

    pub fn merge_calls(&self) -> Vec<(u64, MergeMethod)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ScmCall::MergePr { number, method } => Some((*number, *method)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ScmPlugin for FakeScm {
    async fn detect_pr(
        &self,
        session: &Session,
        _project: &ProjectConfig,
    ) -> Result<Option<PrInfo>, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScmCall::DetectPr {
            session: session.id.clone(),
        });
        Ok(inner.detect_result.clone())
    }

    async fn get_pr_state(&self, _pr: &PrInfo) -> Result<PrState, PluginError> {
        Ok(self.inner.lock().pr_state)
    }

    async fn get_ci_summary(&self, _pr: &PrInfo) -> Result<CiSummary, PluginError> {
        Ok(self.inner.lock().ci_summary)
    }

    async fn get_ci_checks(&self, _pr: &PrInfo) -> Result<Vec<CiCheck>, PluginError> {
        Ok(self.inner.lock().ci_checks.clone())
    }

    async fn get_reviews(&self, _pr: &PrInfo) -> Result<Vec<PrReview>, PluginError> {
        Ok(self.inner.lock().reviews.clone())
    }

    async fn get_review_decision(&self, _pr: &PrInfo) -> Result<ReviewDecision, PluginError> {
        Ok(self.inner.lock().review_decision)
    }

    async fn get_review_requests_count(&self, _pr: &PrInfo) -> Result<usize, PluginError> {
        Ok(self.inner.lock().review_requests)
    }

    async fn get_pending_comments(&self, _pr: &PrInfo) -> Result<Vec<PrComment>, PluginError> {
        Ok(self.inner.lock().pending_comments.clone())
    }

    async fn get_mergeability(&self, _pr: &PrInfo) -> Result<Mergeability, PluginError> {
        Ok(self.inner.lock().mergeability.clone())
    }

    async fn merge_pr(&self, pr: &PrInfo, method: MergeMethod) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScmCall::MergePr {
            number: pr.number,
            method,
        });
        match &inner.merge_error {
            Some(message) => Err(PluginError::OperationFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn supports_pr_listing(&self) -> bool {
        self.inner.lock().supports_listing
    }

    async fn list_open_prs(&self, _project: &ProjectConfig) -> Result<Vec<PrInfo>, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScmCall::ListOpenPrs);
        Ok(inner.open_prs.clone())
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Recorded tracker call
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCall {
    GetIssue { id: IssueId },
    ListIssues { filters: IssueFilters },
    ListComments { id: IssueId },
    GetIssueComments { id: IssueId, since: u64 },
    UpdateIssue { id: IssueId, update: IssueUpdate },
}

#[derive(Default)]
struct FakeTrackerState {
    issues: HashMap<IssueId, Issue>,
    comments: HashMap<IssueId, Vec<IssueComment>>,
    update_error: Option<String>,
    calls: Vec<TrackerCall>,
}

/// Fake tracker plugin backed by in-memory issues.
#[derive(Clone, Default)]
pub struct FakeTracker {
    inner: Arc<Mutex<FakeTrackerState>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&self, issue: Issue) {
        self.inner.lock().issues.insert(issue.id.clone(), issue);
    }

    pub fn add_comment(&self, id: &IssueId, comment: IssueComment) {
        self.inner
            .lock()
            .comments
            .entry(id.clone())
            .or_default()
            .push(comment);
    }

    pub fn fail_updates(&self, message: &str) {
        self.inner.lock().update_error = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.inner.lock().calls.clone()
    }

    /// All `update_issue` calls, in order.
    pub fn updates(&self) -> Vec<(IssueId, IssueUpdate)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                TrackerCall::UpdateIssue { id, update } => Some((id.clone(), update.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl TrackerPlugin for FakeTracker {
    async fn get_issue(
        &self,
        id: &IssueId,
        _project: &ProjectConfig,
    ) -> Result<Issue, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::GetIssue { id: id.clone() });
        inner
            .issues
            .get(id)
            .cloned()
            .ok_or_else(|| PluginError::OperationFailed(format!("no such issue: {}", id)))
    }

    async fn list_issues(
        &self,
        filters: &IssueFilters,
        _project: &ProjectConfig,
    ) -> Result<Vec<Issue>, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::ListIssues {
            filters: filters.clone(),
        });
        let mut issues: Vec<Issue> = inner
            .issues
            .values()
            .filter(|i| {
                filters.state.as_ref().is_none_or(|s| &i.state == s)
                    && filters
                        .workflow_state_name
                        .as_ref()
                        .is_none_or(|w| i.workflow_state_name.as_ref() == Some(w))
            })
            .cloned()
            .collect();
        issues.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        if let Some(limit) = filters.limit {
            issues.truncate(limit);
        }
        Ok(issues)
    }

    async fn list_comments(
        &self,
        id: &IssueId,
        _project: &ProjectConfig,
    ) -> Result<Vec<IssueComment>, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::ListComments { id: id.clone() });
        Ok(inner.comments.get(id).cloned().unwrap_or_default())
    }

    async fn get_issue_comments(
        &self,
        id: &IssueId,
        _project: &ProjectConfig,
        since: u64,
    ) -> Result<Vec<IssueComment>, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::GetIssueComments {
            id: id.clone(),
            since,
        });
        Ok(inner
            .comments
            .get(id)
            .map(|all| {
                all.iter()
                    .filter(|c| c.created_at > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_issue(
        &self,
        id: &IssueId,
        update: &IssueUpdate,
        _project: &ProjectConfig,
    ) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(TrackerCall::UpdateIssue {
            id: id.clone(),
            update: update.clone(),
        });
        if let Some(message) = &inner.update_error {
            return Err(PluginError::OperationFailed(message.clone()));
        }
        if let Some(issue) = inner.issues.get_mut(id) {
            if let Some(state) = &update.state {
                issue.state = state.clone();
            }
            if let Some(workflow) = &update.workflow_state_name {
                issue.workflow_state_name = Some(workflow.clone());
            }
            if let Some(description) = &update.description {
                issue.description = description.clone();
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Recorded notifier call
#[derive(Debug, Clone, PartialEq)]
pub struct NotifierCall {
    pub event: OrchestratorEvent,
}

#[derive(Default)]
struct FakeNotifierState {
    calls: Vec<NotifierCall>,
    failing: bool,
}

/// Fake notifier recording every event it receives.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    inner: Arc<Mutex<FakeNotifierState>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.inner.lock().failing = true;
    }

    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.inner
            .lock()
            .calls
            .iter()
            .map(|c| c.event.clone())
            .collect()
    }
}

#[async_trait]
impl NotifierPlugin for FakeNotifier {
    async fn notify(&self, event: &OrchestratorEvent) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(NotifierCall {
            event: event.clone(),
        });
        if inner.failing {
            return Err(PluginError::OperationFailed("notifier down".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session manager
// ---------------------------------------------------------------------------

/// Recorded session-manager call
#[derive(Debug, Clone, PartialEq)]
pub enum SessionManagerCall {
    Spawn { request: SpawnRequest },
    Send { id: SessionId, message: String },
    Kill { id: SessionId },
}

#[derive(Default)]
struct FakeSessionManagerState {
    sessions: Vec<Session>,
    next_seq: HashMap<String, u64>,
    spawn_errors: Vec<String>,
    send_error: Option<String>,
    calls: Vec<SessionManagerCall>,
}

/// Fake session manager over an in-memory session list.
#[derive(Clone, Default)]
pub struct FakeSessionManager {
    inner: Arc<Mutex<FakeSessionManagerState>>,
}

impl FakeSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, session: Session) {
        self.inner.lock().sessions.push(session);
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        self.inner.lock().sessions = sessions;
    }

    pub fn remove_session(&self, id: &SessionId) {
        self.inner.lock().sessions.retain(|s| &s.id != id);
    }

    /// Queue a spawn failure; each queued error fails one spawn call.
    pub fn fail_next_spawn(&self, message: &str) {
        self.inner.lock().spawn_errors.push(message.to_string());
    }

    pub fn fail_sends(&self, message: &str) {
        self.inner.lock().send_error = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<SessionManagerCall> {
        self.inner.lock().calls.clone()
    }

    /// All `send` calls, in order.
    pub fn sent(&self) -> Vec<(SessionId, String)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SessionManagerCall::Send { id, message } => {
                    Some((id.clone(), message.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn spawned(&self) -> Vec<SpawnRequest> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                SessionManagerCall::Spawn { request } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionManager for FakeSessionManager {
    async fn spawn(&self, request: &SpawnRequest) -> Result<Session, PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionManagerCall::Spawn {
            request: request.clone(),
        });
        if !inner.spawn_errors.is_empty() {
            let message = inner.spawn_errors.remove(0);
            return Err(PluginError::SpawnFailed(message));
        }
        let prefix = request.project_id.to_string();
        let seq = inner.next_seq.entry(prefix.clone()).or_insert(0);
        *seq += 1;
        let session = Session {
            id: SessionId::numbered(&prefix, *seq),
            project_id: request.project_id.clone(),
            branch: None,
            issue_id: request.issue_id.clone(),
            pr: None,
            workspace_path: None,
            runtime_handle: Some(format!("tmux-{}-{}", prefix, seq)),
            created_at: 0,
            last_activity_at: 0,
            status: SessionStatus::Spawning,
            metadata: HashMap::new(),
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, PluginError> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn list(&self, project_id: Option<&ProjectId>) -> Result<Vec<Session>, PluginError> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .filter(|s| project_id.is_none_or(|p| &s.project_id == p))
            .cloned()
            .collect())
    }

    async fn send(&self, id: &SessionId, message: &str) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionManagerCall::Send {
            id: id.clone(),
            message: message.to_string(),
        });
        if let Some(message) = &inner.send_error {
            return Err(PluginError::OperationFailed(message.clone()));
        }
        Ok(())
    }

    async fn kill(&self, id: &SessionId) -> Result<(), PluginError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionManagerCall::Kill { id: id.clone() });
        inner.sessions.retain(|s| &s.id != id);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
