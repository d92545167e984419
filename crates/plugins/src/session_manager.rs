// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager capability: the component that owns session spawning,
//! listing, and message delivery. The engine never spawns processes or
//! clones workspaces itself.

use crate::PluginError;
use async_trait::async_trait;
use fleet_core::{IssueId, ProjectId, Session, SessionId};

/// Request to spawn a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub project_id: ProjectId,
    pub issue_id: Option<IssueId>,
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn spawn(&self, request: &SpawnRequest) -> Result<Session, PluginError>;

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, PluginError>;

    /// Snapshot of all live sessions, optionally restricted to a project.
    async fn list(&self, project_id: Option<&ProjectId>) -> Result<Vec<Session>, PluginError>;

    /// Deliver a message to the session's agent.
    async fn send(&self, id: &SessionId, message: &str) -> Result<(), PluginError>;

    async fn kill(&self, id: &SessionId) -> Result<(), PluginError>;
}

/// Session manager with no sessions. Lets the daemon run with supervision
/// effectively disabled until a real manager is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSessionManager;

#[async_trait]
impl SessionManager for NoopSessionManager {
    async fn spawn(&self, _request: &SpawnRequest) -> Result<Session, PluginError> {
        Err(PluginError::Unsupported("spawn"))
    }

    async fn get(&self, _id: &SessionId) -> Result<Option<Session>, PluginError> {
        Ok(None)
    }

    async fn list(&self, _project_id: Option<&ProjectId>) -> Result<Vec<Session>, PluginError> {
        Ok(Vec::new())
    }

    async fn send(&self, id: &SessionId, _message: &str) -> Result<(), PluginError> {
        Err(PluginError::SessionNotFound(id.to_string()))
    }

    async fn kill(&self, _id: &SessionId) -> Result<(), PluginError> {
        Ok(())
    }
}
