// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracker capability: issues, comments, and workflow-state updates.

use crate::PluginError;
use async_trait::async_trait;
use fleet_core::{Issue, IssueComment, IssueFilters, IssueId, IssueUpdate, ProjectConfig};

#[async_trait]
pub trait TrackerPlugin: Send + Sync {
    async fn get_issue(
        &self,
        id: &IssueId,
        project: &ProjectConfig,
    ) -> Result<Issue, PluginError>;

    async fn list_issues(
        &self,
        filters: &IssueFilters,
        project: &ProjectConfig,
    ) -> Result<Vec<Issue>, PluginError>;

    /// All comments on an issue, oldest first.
    async fn list_comments(
        &self,
        id: &IssueId,
        project: &ProjectConfig,
    ) -> Result<Vec<IssueComment>, PluginError>;

    /// Comments created strictly after `since` (epoch ms), oldest first.
    async fn get_issue_comments(
        &self,
        id: &IssueId,
        project: &ProjectConfig,
        since: u64,
    ) -> Result<Vec<IssueComment>, PluginError>;

    async fn update_issue(
        &self,
        id: &IssueId,
        update: &IssueUpdate,
        project: &ProjectConfig,
    ) -> Result<(), PluginError>;
}
