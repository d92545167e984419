// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration, read once at startup from TOML.
//!
//! Hot-reload is deliberately unsupported; restart the daemon to pick up
//! changes.

use crate::event::Priority;
use crate::reaction::ReactionConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How a PR is merged once the merge gate clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMethod {
    Merge,
    #[default]
    Squash,
    Rebase,
}

impl MergeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Poll interval in milliseconds.
    pub interval_ms: u64,
    /// External-PR adoption scan runs every Nth poll cycle.
    pub pr_scan_every: u64,
    /// Trusted reviewer/author logins. Empty means unfiltered.
    pub allowed_users: Vec<String>,
    pub defaults: DefaultsConfig,
    pub notification_routing: NotificationRouting,
    /// Global reaction table, keyed by reaction key.
    pub reactions: HashMap<String, ReactionConfig>,
    /// Projects by id, in declaration order.
    pub projects: IndexMap<String, ProjectConfig>,
    /// Root directory for session sidecar metadata files.
    pub sessions_dir: PathBuf,
}

impl OrchestratorConfig {
    /// Parse from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Merged reaction config for `(project, key)`: project overlays global.
    pub fn reaction(&self, project_id: &str, key: &str) -> Option<ReactionConfig> {
        let global = self.reactions.get(key);
        let project = self
            .projects
            .get(project_id)
            .and_then(|p| p.reactions.get(key));
        ReactionConfig::merged(global, project)
    }

    /// Notifier names for a priority, falling back to the default list.
    pub fn notifiers_for(&self, priority: Priority) -> &[String] {
        let routed = self.notification_routing.names_for(priority);
        if routed.is_empty() {
            &self.defaults.notifiers
        } else {
            routed
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            pr_scan_every: 10,
            allowed_users: Vec::new(),
            defaults: DefaultsConfig::default(),
            notification_routing: NotificationRouting::default(),
            reactions: HashMap::new(),
            projects: IndexMap::new(),
            sessions_dir: PathBuf::from(".fleet/sessions"),
        }
    }
}

/// Default plugin names applied to projects that do not override them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub runtime: Option<String>,
    pub agent: Option<String>,
    pub workspace: Option<String>,
    pub notifiers: Vec<String>,
}

/// Notifier-name lists per priority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationRouting {
    pub urgent: Vec<String>,
    pub action: Vec<String>,
    pub warning: Vec<String>,
    pub info: Vec<String>,
}

impl NotificationRouting {
    pub fn names_for(&self, priority: Priority) -> &[String] {
        match priority {
            Priority::Urgent => &self.urgent,
            Priority::Action => &self.action,
            Priority::Warning => &self.warning,
            Priority::Info => &self.info,
        }
    }
}

/// Reference to a named plugin in a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub plugin: String,
}

/// One supervised project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// `owner/repo` in the SCM.
    pub repo: String,
    pub path: PathBuf,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Prefix for session ids (`{prefix}-{n}`).
    pub session_prefix: String,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub tracker: Option<PluginRef>,
    #[serde(default)]
    pub scm: Option<PluginRef>,
    /// Per-project reaction overrides.
    #[serde(default)]
    pub reactions: HashMap<String, ReactionConfig>,
    #[serde(default)]
    pub automation: AutomationConfig,
}

fn default_branch() -> String {
    "main".to_string()
}

impl ProjectConfig {
    /// Effective agent plugin name, falling back to the daemon default.
    pub fn agent_name<'a>(&'a self, defaults: &'a DefaultsConfig) -> Option<&'a str> {
        self.agent.as_deref().or(defaults.agent.as_deref())
    }

    /// Effective runtime plugin name, falling back to the daemon default.
    pub fn runtime_name<'a>(&'a self, defaults: &'a DefaultsConfig) -> Option<&'a str> {
        self.runtime.as_deref().or(defaults.runtime.as_deref())
    }
}

/// Automation toggles per project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub queue_pickup: QueuePickupConfig,
    pub merge_gate: MergeGateConfig,
    pub completion_gate: CompletionGateConfig,
    pub stuck_recovery: StuckRecoveryConfig,
}

/// Admission of new tracker issues as sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePickupConfig {
    pub enabled: bool,
    pub interval_sec: u64,
    pub pickup_state_name: String,
    pub transition_state_name: Option<String>,
    /// Require an `AO_META … pipeline=queued` marker in the description.
    pub require_ao_meta_queued: bool,
    pub max_active_sessions: usize,
    pub max_spawn_per_cycle: usize,
}

impl Default for QueuePickupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_sec: 60,
            pickup_state_name: "Todo".to_string(),
            transition_state_name: None,
            require_ao_meta_queued: true,
            max_active_sessions: 8,
            max_spawn_per_cycle: 4,
        }
    }
}

/// Auto-merge gating.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeGateConfig {
    pub enabled: bool,
    pub method: MergeMethod,
    pub retry_cooldown_sec: u64,
    pub strict: StrictMergeConfig,
}

impl Default for MergeGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: MergeMethod::Squash,
            retry_cooldown_sec: 300,
            strict: StrictMergeConfig::default(),
        }
    }
}

/// Independently toggleable merge sub-gates. All on by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictMergeConfig {
    pub require_verify_marker: bool,
    pub require_browser_marker: bool,
    pub require_approved_review_or_no_requests: bool,
    pub require_no_unresolved_threads: bool,
    pub require_passing_checks: bool,
    pub require_completion_dry_run: bool,
}

impl Default for StrictMergeConfig {
    fn default() -> Self {
        Self {
            require_verify_marker: true,
            require_browser_marker: true,
            require_approved_review_or_no_requests: true,
            require_no_unresolved_threads: true,
            require_passing_checks: true,
            require_completion_dry_run: true,
        }
    }
}

/// Tracker-close gating on the issue's acceptance checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionGateConfig {
    pub enabled: bool,
    /// Case-insensitive regex matched against the description and comments.
    pub evidence_pattern: String,
    pub sync_checklist_from_evidence: bool,
}

impl Default for CompletionGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            evidence_pattern: "AC Evidence:|검증 근거:".to_string(),
            sync_checklist_from_evidence: false,
        }
    }
}

/// Recovery nudges for agents stuck on an interactive prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckRecoveryConfig {
    pub enabled: bool,
    /// Regex matched against recent terminal output. Unset disables.
    pub pattern: Option<String>,
    /// The match must persist this long before recovery fires.
    pub threshold_sec: u64,
    /// Minimum gap between recovery messages.
    pub cooldown_sec: u64,
    pub message: Option<String>,
}

impl Default for StuckRecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pattern: None,
            threshold_sec: 600,
            cooldown_sec: 300,
            message: None,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
