// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{FakeNotifier, FakeScm, FakeTracker};
use std::sync::Arc;

#[test]
fn lookup_by_slot_and_name() {
    let mut registry = PluginRegistry::new();
    registry
        .register_scm("github", Arc::new(FakeScm::new()))
        .register_tracker("linear", Arc::new(FakeTracker::new()))
        .register_notifier("desktop", Arc::new(FakeNotifier::new()));

    assert!(registry.scm("github").is_some());
    assert!(registry.scm("gitlab").is_none());
    assert!(registry.tracker("linear").is_some());
    assert!(registry.notifier("desktop").is_some());
    assert!(registry.runtime("tmux").is_none());
}

#[test]
fn slots_do_not_collide() {
    let mut registry = PluginRegistry::new();
    registry
        .register_scm("acme", Arc::new(FakeScm::new()))
        .register_tracker("acme", Arc::new(FakeTracker::new()));

    assert!(registry.scm("acme").is_some());
    assert!(registry.tracker("acme").is_some());
    assert!(registry.notifier("acme").is_none());
}
