// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fleet-core: domain types for the Fleet agent orchestrator

pub mod agent;
pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod reaction;
pub mod scm;
pub mod session;
pub mod tracker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::AgentActivity;
pub use clock::{format_utc, parse_duration, Clock, FakeClock, SystemClock};
pub use config::{
    AutomationConfig, CompletionGateConfig, DefaultsConfig, MergeGateConfig, MergeMethod,
    NotificationRouting, OrchestratorConfig, ProjectConfig, QueuePickupConfig, StrictMergeConfig,
    StuckRecoveryConfig,
};
pub use event::{EventType, OrchestratorEvent, Priority};
pub use id::{EventId, IssueId, ProjectId, SessionId};
pub use reaction::{EscalateAfter, ReactionAction, ReactionConfig, ReactionFilter, ReactionTracker};
pub use scm::{
    CheckStatus, CiCheck, CiSummary, Mergeability, PrComment, PrInfo, PrReview, PrState,
    ReviewDecision, ReviewState,
};
pub use session::{Session, SessionStatus};
pub use tracker::{Issue, IssueComment, IssueFilters, IssueUpdate};
