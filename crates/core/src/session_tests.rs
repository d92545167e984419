// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::session;
use std::str::FromStr;

#[test]
fn terminal_statuses() {
    assert!(SessionStatus::Merged.is_terminal());
    assert!(SessionStatus::Killed.is_terminal());
    assert!(!SessionStatus::Working.is_terminal());
    assert!(!SessionStatus::Errored.is_terminal());
}

#[yare::parameterized(
    spawning = { SessionStatus::Spawning, "spawning" },
    needs_input = { SessionStatus::NeedsInput, "needs_input" },
    pr_open = { SessionStatus::PrOpen, "pr_open" },
    ci_failed = { SessionStatus::CiFailed, "ci_failed" },
    changes_requested = { SessionStatus::ChangesRequested, "changes_requested" },
    mergeable = { SessionStatus::Mergeable, "mergeable" },
)]
fn status_string_round_trip(status: SessionStatus, s: &str) {
    assert_eq!(status.as_str(), s);
    assert_eq!(SessionStatus::from_str(s).unwrap(), status);
}

#[test]
fn status_from_str_rejects_unknown() {
    assert!(SessionStatus::from_str("paused").is_err());
}

#[test]
fn status_serde_uses_snake_case() {
    let json = serde_json::to_string(&SessionStatus::ReviewPending).unwrap();
    assert_eq!(json, "\"review_pending\"");
}

#[test]
fn meta_treats_empty_as_absent() {
    let mut s = session("app-1", "app");
    s.metadata.insert(meta::SUMMARY.to_string(), String::new());
    assert_eq!(s.meta(meta::SUMMARY), None);
    s.metadata
        .insert(meta::SUMMARY.to_string(), "added retries".to_string());
    assert_eq!(s.meta(meta::SUMMARY), Some("added retries"));
}

#[test]
fn adopted_when_flag_set_or_no_runtime() {
    let mut s = session("app-1", "app");
    assert!(s.is_adopted());

    s.runtime_handle = Some("tmux-app-1".to_string());
    assert!(!s.is_adopted());

    s.metadata
        .insert(meta::ADOPTED.to_string(), "true".to_string());
    assert!(s.is_adopted());
}
