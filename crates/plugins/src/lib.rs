// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-plugins: capability interfaces at the orchestrator's boundaries.
//!
//! Each external collaborator (runtime, agent classifier, SCM, tracker,
//! notifier, session manager) is a capability trait. The engine depends
//! only on these traits; a [`PluginRegistry`] maps `(slot, name)` to the
//! implementation a project selected in config.

mod agent;
mod notifier;
mod registry;
mod runtime;
mod scm;
mod session_manager;
mod tracker;

pub use agent::AgentPlugin;
pub use notifier::{DesktopNotifier, NoopNotifier, NotifierPlugin};
pub use registry::PluginRegistry;
pub use runtime::RuntimePlugin;
pub use scm::ScmPlugin;
pub use session_manager::{NoopSessionManager, SessionManager, SpawnRequest};
pub use tracker::TrackerPlugin;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{
    FakeAgent, FakeNotifier, FakeRuntime, FakeScm, FakeSessionManager, FakeTracker, NotifierCall,
    RuntimeCall, ScmCall, SessionManagerCall, TrackerCall,
};

use thiserror::Error;

/// Errors surfaced by plugin operations.
///
/// The engine treats most of these as transient: probe failures are
/// swallowed by the classifier and reactions report failure without
/// escalating, so the next cycle retries.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin not found: {slot}/{name}")]
    NotFound { slot: &'static str, name: String },
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
