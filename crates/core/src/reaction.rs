// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaction configuration and per-reaction attempt tracking.
//!
//! A reaction is a configured response to a lifecycle transition, keyed by a
//! stable identifier ("ci-failed", "approved-and-green", …). Project-level
//! reaction config overlays the global config field by field.

use crate::event::Priority;
use serde::{Deserialize, Serialize};

/// Stable reaction keys wired to transitions by the router.
pub mod keys {
    pub const ISSUE_PROGRESS_PR_OPENED: &str = "issue-progress-pr-opened";
    pub const ISSUE_PROGRESS_REVIEW_UPDATED: &str = "issue-progress-review-updated";
    pub const CI_FAILED: &str = "ci-failed";
    pub const AUTO_REVIEW: &str = "auto-review";
    pub const CHANGES_REQUESTED: &str = "changes-requested";
    pub const APPROVED_AND_GREEN: &str = "approved-and-green";
    pub const ISSUE_COMPLETED: &str = "issue-completed";
    pub const AGENT_NEEDS_INPUT: &str = "agent-needs-input";
    pub const AGENT_STUCK: &str = "agent-stuck";
    pub const AGENT_EXITED: &str = "agent-exited";
    pub const ISSUE_COMMENTED: &str = "issue-commented";
    pub const BUGBOT_COMMENTS: &str = "bugbot-comments";
}

/// The closed set of actions a reaction can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionAction {
    Notify,
    SendToAgent,
    AutoMerge,
    SpawnReviewer,
    SpawnAgent,
    CompleteTrackerIssue,
    UpdateTrackerProgress,
}

/// Escalation threshold: either an attempt count or a wall-clock window.
///
/// Deserializes from an integer (`escalate_after = 3`) or a duration string
/// (`escalate_after = "30m"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EscalateAfter {
    Count(u32),
    Window(String),
}

/// Author/label filters applied before a reaction fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}

/// One reaction's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionConfig {
    /// `false` disables automatic execution; notify reactions run anyway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
    pub action: ReactionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Script path for `spawn-reviewer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Attempts before forced escalation. Unset means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_after: Option<EscalateAfter>,
    /// Duration string (`"5m"`), consulted by cooldown-aware actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<ReactionFilter>,
}

impl ReactionConfig {
    /// Minimal config running the given action automatically.
    pub fn simple(action: ReactionAction) -> Self {
        Self {
            auto: None,
            action,
            message: None,
            script: None,
            retries: None,
            escalate_after: None,
            cooldown: None,
            priority: None,
            filter: None,
        }
    }

    /// Whether the executor should run this reaction on a transition.
    /// Notify reactions always run so humans still hear about the event.
    pub fn should_run(&self) -> bool {
        self.auto != Some(false) || self.action == ReactionAction::Notify
    }

    /// Overlay `project` onto `global`: the project's action wins, and its
    /// unset optional fields fall back to the global values.
    pub fn merged(global: Option<&Self>, project: Option<&Self>) -> Option<Self> {
        match (global, project) {
            (None, None) => None,
            (Some(g), None) => Some(g.clone()),
            (None, Some(p)) => Some(p.clone()),
            (Some(g), Some(p)) => {
                let mut out = p.clone();
                out.auto = p.auto.or(g.auto);
                out.message = p.message.clone().or_else(|| g.message.clone());
                out.script = p.script.clone().or_else(|| g.script.clone());
                out.retries = p.retries.or(g.retries);
                out.escalate_after = p
                    .escalate_after
                    .clone()
                    .or_else(|| g.escalate_after.clone());
                out.cooldown = p.cooldown.clone().or_else(|| g.cooldown.clone());
                out.priority = p.priority.or(g.priority);
                out.filter = p.filter.clone().or_else(|| g.filter.clone());
                Some(out)
            }
        }
    }
}

/// Attempt accounting for one `(session, reaction key)` pair.
///
/// Created on first trigger, cleared when the session leaves the status
/// that spawned the reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTracker {
    pub attempts: u32,
    /// Epoch milliseconds of the first trigger.
    pub first_triggered: u64,
}

impl ReactionTracker {
    pub fn started_at(now: u64) -> Self {
        Self {
            attempts: 0,
            first_triggered: now,
        }
    }
}

#[cfg(test)]
#[path = "reaction_tests.rs"]
mod tests;
