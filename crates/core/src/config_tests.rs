// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::reaction::ReactionAction;

const SAMPLE: &str = r#"
interval_ms = 15000
allowed_users = ["alice", "review-bot"]

[defaults]
runtime = "tmux"
agent = "claude"
notifiers = ["desktop"]

[notification_routing]
urgent = ["desktop", "pager"]

[reactions.ci-failed]
action = "send-to-agent"
message = "CI failing"
retries = 2

[projects.app]
name = "App"
repo = "acme/app"
path = "/srv/app"
session_prefix = "app"
tracker = { plugin = "linear" }
scm = { plugin = "github" }

[projects.app.reactions.ci-failed]
action = "send-to-agent"
retries = 5

[projects.app.automation.queue_pickup]
enabled = true
max_spawn_per_cycle = 2

[projects.app.automation.merge_gate.strict]
require_browser_marker = false
"#;

#[test]
fn parses_sample_config() {
    let config = OrchestratorConfig::from_toml(SAMPLE).unwrap();
    assert_eq!(config.interval_ms, 15_000);
    assert_eq!(config.pr_scan_every, 10); // default
    assert_eq!(config.allowed_users, vec!["alice", "review-bot"]);
    assert_eq!(config.defaults.agent.as_deref(), Some("claude"));

    let app = &config.projects["app"];
    assert_eq!(app.repo, "acme/app");
    assert_eq!(app.default_branch, "main");
    assert_eq!(app.tracker.as_ref().map(|t| t.plugin.as_str()), Some("linear"));
    assert!(app.automation.queue_pickup.enabled);
    assert_eq!(app.automation.queue_pickup.max_spawn_per_cycle, 2);
    assert_eq!(app.automation.queue_pickup.max_active_sessions, 8); // default
    assert!(!app.automation.merge_gate.strict.require_browser_marker);
    assert!(app.automation.merge_gate.strict.require_verify_marker);
}

#[test]
fn reaction_merge_overlays_project_over_global() {
    let config = OrchestratorConfig::from_toml(SAMPLE).unwrap();
    let merged = config.reaction("app", "ci-failed").unwrap();
    assert_eq!(merged.action, ReactionAction::SendToAgent);
    assert_eq!(merged.retries, Some(5)); // project wins
    assert_eq!(merged.message.as_deref(), Some("CI failing")); // inherited
}

#[test]
fn reaction_merge_global_only() {
    let config = OrchestratorConfig::from_toml(SAMPLE).unwrap();
    let merged = config.reaction("unknown-project", "ci-failed").unwrap();
    assert_eq!(merged.retries, Some(2));
}

#[test]
fn notifier_routing_falls_back_to_defaults() {
    let config = OrchestratorConfig::from_toml(SAMPLE).unwrap();
    assert_eq!(
        config.notifiers_for(Priority::Urgent),
        ["desktop".to_string(), "pager".to_string()]
    );
    // No warning route configured: falls back to defaults.notifiers.
    assert_eq!(config.notifiers_for(Priority::Warning), ["desktop".to_string()]);
}

#[test]
fn automation_defaults_match_documented_values() {
    let q = QueuePickupConfig::default();
    assert!(!q.enabled);
    assert_eq!(q.interval_sec, 60);
    assert_eq!(q.pickup_state_name, "Todo");
    assert!(q.require_ao_meta_queued);

    let m = MergeGateConfig::default();
    assert!(m.enabled);
    assert_eq!(m.method, MergeMethod::Squash);
    assert_eq!(m.retry_cooldown_sec, 300);

    let c = CompletionGateConfig::default();
    assert!(c.enabled);
    assert!(c.evidence_pattern.contains("AC Evidence:"));
    assert!(!c.sync_checklist_from_evidence);

    let s = StuckRecoveryConfig::default();
    assert!(s.enabled);
    assert_eq!(s.threshold_sec, 600);
    assert_eq!(s.cooldown_sec, 300);
}

#[test]
fn empty_config_is_valid() {
    let config = OrchestratorConfig::from_toml("").unwrap();
    assert_eq!(config.interval_ms, 30_000);
    assert!(config.projects.is_empty());
}
