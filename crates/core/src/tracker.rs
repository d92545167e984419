// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker-side observation and mutation types.

use crate::id::IssueId;
use serde::{Deserialize, Serialize};

/// One tracker issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Open/closed state as the tracker reports it.
    #[serde(default)]
    pub state: String,
    /// Workflow column name (e.g. "Todo", "In Progress", "In Review").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_name: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// One comment on a tracker issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
    /// Epoch milliseconds of creation.
    pub created_at: u64,
}

/// Filters for [`listIssues`]-style queries. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Partial update applied to a tracker issue. Unset fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl IssueUpdate {
    /// Update that closes the issue with an audit comment.
    pub fn close_with_comment(comment: impl Into<String>) -> Self {
        Self {
            state: Some("closed".to_string()),
            comment: Some(comment.into()),
            ..Self::default()
        }
    }
}
