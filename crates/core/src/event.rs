// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator events and priority inference.

use crate::id::{EventId, ProjectId, SessionId};
use serde::{Deserialize, Serialize};

/// Event types emitted by the lifecycle engine. Closed set.
///
/// Serializes with the dotted wire name (`"review.pending"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "session.working")]
    SessionWorking,
    #[serde(rename = "session.needs_input")]
    SessionNeedsInput,
    #[serde(rename = "session.stuck")]
    SessionStuck,
    #[serde(rename = "session.killed")]
    SessionKilled,
    #[serde(rename = "session.errored")]
    SessionErrored,
    #[serde(rename = "pr.created")]
    PrCreated,
    #[serde(rename = "ci.failing")]
    CiFailing,
    #[serde(rename = "review.pending")]
    ReviewPending,
    #[serde(rename = "review.changes_requested")]
    ReviewChangesRequested,
    #[serde(rename = "review.approved")]
    ReviewApproved,
    #[serde(rename = "merge.ready")]
    MergeReady,
    #[serde(rename = "merge.completed")]
    MergeCompleted,
    #[serde(rename = "issue.comment_added")]
    IssueCommentAdded,
    #[serde(rename = "reaction.triggered")]
    ReactionTriggered,
    #[serde(rename = "reaction.escalated")]
    ReactionEscalated,
    #[serde(rename = "summary.all_complete")]
    AllSessionsComplete,
}

impl EventType {
    /// Dotted wire name, e.g. `review.changes_requested`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SessionWorking => "session.working",
            EventType::SessionNeedsInput => "session.needs_input",
            EventType::SessionStuck => "session.stuck",
            EventType::SessionKilled => "session.killed",
            EventType::SessionErrored => "session.errored",
            EventType::PrCreated => "pr.created",
            EventType::CiFailing => "ci.failing",
            EventType::ReviewPending => "review.pending",
            EventType::ReviewChangesRequested => "review.changes_requested",
            EventType::ReviewApproved => "review.approved",
            EventType::MergeReady => "merge.ready",
            EventType::MergeCompleted => "merge.completed",
            EventType::IssueCommentAdded => "issue.comment_added",
            EventType::ReactionTriggered => "reaction.triggered",
            EventType::ReactionEscalated => "reaction.escalated",
            EventType::AllSessionsComplete => "summary.all_complete",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification priority. Routed to notifier groups by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    Action,
    Warning,
    Info,
}

impl Priority {
    /// Infer a priority from an event-type name.
    ///
    /// Matched in order: human-blocking conditions are urgent, completed or
    /// actionable milestones are action, degradations are warning,
    /// summaries and everything else are info.
    pub fn infer(event_type: &str) -> Self {
        if ["stuck", "needs_input", "errored"]
            .iter()
            .any(|m| event_type.contains(m))
        {
            return Priority::Urgent;
        }
        if ["approved", "ready", "merged", "completed"]
            .iter()
            .any(|m| event_type.contains(m))
        {
            return Priority::Action;
        }
        if ["fail", "changes_requested", "conflicts"]
            .iter()
            .any(|m| event_type.contains(m))
        {
            return Priority::Warning;
        }
        Priority::Info
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::Action => "action",
            Priority::Warning => "warning",
            Priority::Info => "info",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event flowing from the engine to notifiers and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// Epoch milliseconds at assembly time.
    pub timestamp: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl OrchestratorEvent {
    /// Assemble an event with priority inferred from the type.
    pub fn new(event_type: EventType, timestamp: u64, message: impl Into<String>) -> Self {
        Self {
            id: EventId::generate(),
            event_type,
            priority: Priority::infer(event_type.as_str()),
            session_id: None,
            project_id: None,
            timestamp,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn for_session(mut self, session_id: SessionId, project_id: ProjectId) -> Self {
        self.session_id = Some(session_id);
        self.project_id = Some(project_id);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// One-line form for the daemon log.
    pub fn log_summary(&self) -> String {
        match (&self.session_id, &self.project_id) {
            (Some(sid), Some(pid)) => {
                format!("{} session={} project={}", self.event_type, sid, pid)
            }
            (Some(sid), None) => format!("{} session={}", self.event_type, sid),
            _ => self.event_type.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
