// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-side observation types.

use serde::{Deserialize, Serialize};

/// What the agent plugin infers from recent terminal output.
///
/// `WaitingInput` means the agent is showing a prompt and will not make
/// progress until someone answers. `Idle` and `Active` are advisory only:
/// a dead process can still render an "active"-looking shell prompt, so
/// liveness is always checked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentActivity {
    Active,
    Idle,
    WaitingInput,
}
