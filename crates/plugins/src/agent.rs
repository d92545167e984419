// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent capability: vendor-specific interpretation of a coding agent's
//! terminal output and process state.

use crate::PluginError;
use async_trait::async_trait;
use fleet_core::{AgentActivity, Session};

#[async_trait]
pub trait AgentPlugin: Send + Sync {
    /// Plugin name as referenced in config (e.g. "claude", "codex").
    fn name(&self) -> &str;

    /// Classify recent terminal output.
    ///
    /// Implementations must treat an "active"-looking shell prompt with a
    /// dead process as the runtime's problem: the engine always checks
    /// [`is_process_running`](Self::is_process_running) separately.
    fn detect_activity(&self, terminal_output: &str) -> AgentActivity;

    /// Whether the agent process itself is still running inside the runtime.
    async fn is_process_running(&self, handle: &str) -> Result<bool, PluginError>;

    /// One-line summary of what the session is doing, if the agent's own
    /// state files provide one.
    async fn session_summary(&self, session: &Session) -> Result<Option<String>, PluginError>;

    /// Binary name, for pre-flight checks.
    fn binary_name(&self) -> Option<&str> {
        None
    }
}
