// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SCM capability: pull requests, CI, reviews, and merging.

use crate::PluginError;
use async_trait::async_trait;
use fleet_core::{
    CiCheck, CiSummary, Mergeability, MergeMethod, PrComment, PrInfo, PrReview, PrState,
    ProjectConfig, ReviewDecision, Session,
};

#[async_trait]
pub trait ScmPlugin: Send + Sync {
    /// Find the open PR for a session's branch, if one exists.
    async fn detect_pr(
        &self,
        session: &Session,
        project: &ProjectConfig,
    ) -> Result<Option<PrInfo>, PluginError>;

    async fn get_pr_state(&self, pr: &PrInfo) -> Result<PrState, PluginError>;

    async fn get_ci_summary(&self, pr: &PrInfo) -> Result<CiSummary, PluginError>;

    async fn get_ci_checks(&self, pr: &PrInfo) -> Result<Vec<CiCheck>, PluginError>;

    /// All submitted reviews, oldest first.
    async fn get_reviews(&self, pr: &PrInfo) -> Result<Vec<PrReview>, PluginError>;

    /// The SCM's own folded review decision.
    async fn get_review_decision(&self, pr: &PrInfo) -> Result<ReviewDecision, PluginError>;

    /// Outstanding review requests (reviewers asked but not yet reviewed).
    async fn get_review_requests_count(&self, pr: &PrInfo) -> Result<usize, PluginError>;

    /// Unresolved review threads/comments.
    async fn get_pending_comments(&self, pr: &PrInfo) -> Result<Vec<PrComment>, PluginError>;

    async fn get_mergeability(&self, pr: &PrInfo) -> Result<Mergeability, PluginError>;

    async fn merge_pr(&self, pr: &PrInfo, method: MergeMethod) -> Result<(), PluginError>;

    /// Whether [`list_open_prs`](Self::list_open_prs) is implemented.
    fn supports_pr_listing(&self) -> bool {
        false
    }

    /// All open PRs in the project's repo. Only called when
    /// [`supports_pr_listing`](Self::supports_pr_listing) returns true.
    async fn list_open_prs(&self, project: &ProjectConfig) -> Result<Vec<PrInfo>, PluginError> {
        let _ = project;
        Err(PluginError::Unsupported("list_open_prs"))
    }
}
