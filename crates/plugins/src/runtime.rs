// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime capability: the execution environment holding an agent's
//! terminal (tmux pane, container, …).

use crate::PluginError;
use async_trait::async_trait;

/// Operations on a session's runtime handle.
#[async_trait]
pub trait RuntimePlugin: Send + Sync {
    /// Whether the runtime behind the handle still exists.
    async fn is_alive(&self, handle: &str) -> Result<bool, PluginError>;

    /// Capture the last `lines` lines of terminal output.
    async fn get_output(&self, handle: &str, lines: u32) -> Result<String, PluginError>;

    /// Send keystrokes to the terminal.
    async fn send_message(&self, handle: &str, text: &str) -> Result<(), PluginError>;

    /// Tear the runtime down.
    async fn destroy(&self, handle: &str) -> Result<(), PluginError>;
}
