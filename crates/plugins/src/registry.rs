// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin registry: `(slot, name)` to capability lookup.
//!
//! Projects name the plugins they use; the registry resolves those names to
//! the capabilities registered at startup. Slots are independent maps so a
//! tracker and an SCM may share a name without colliding.

use crate::{AgentPlugin, NotifierPlugin, RuntimePlugin, ScmPlugin, TrackerPlugin};
use std::collections::HashMap;
use std::sync::Arc;

/// Registered capabilities by slot and name.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    runtimes: HashMap<String, Arc<dyn RuntimePlugin>>,
    agents: HashMap<String, Arc<dyn AgentPlugin>>,
    scms: HashMap<String, Arc<dyn ScmPlugin>>,
    trackers: HashMap<String, Arc<dyn TrackerPlugin>>,
    notifiers: HashMap<String, Arc<dyn NotifierPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_runtime(&mut self, name: &str, plugin: Arc<dyn RuntimePlugin>) -> &mut Self {
        self.runtimes.insert(name.to_string(), plugin);
        self
    }

    pub fn register_agent(&mut self, name: &str, plugin: Arc<dyn AgentPlugin>) -> &mut Self {
        self.agents.insert(name.to_string(), plugin);
        self
    }

    pub fn register_scm(&mut self, name: &str, plugin: Arc<dyn ScmPlugin>) -> &mut Self {
        self.scms.insert(name.to_string(), plugin);
        self
    }

    pub fn register_tracker(&mut self, name: &str, plugin: Arc<dyn TrackerPlugin>) -> &mut Self {
        self.trackers.insert(name.to_string(), plugin);
        self
    }

    pub fn register_notifier(&mut self, name: &str, plugin: Arc<dyn NotifierPlugin>) -> &mut Self {
        self.notifiers.insert(name.to_string(), plugin);
        self
    }

    pub fn runtime(&self, name: &str) -> Option<Arc<dyn RuntimePlugin>> {
        self.runtimes.get(name).cloned()
    }

    pub fn agent(&self, name: &str) -> Option<Arc<dyn AgentPlugin>> {
        self.agents.get(name).cloned()
    }

    pub fn scm(&self, name: &str) -> Option<Arc<dyn ScmPlugin>> {
        self.scms.get(name).cloned()
    }

    pub fn tracker(&self, name: &str) -> Option<Arc<dyn TrackerPlugin>> {
        self.trackers.get(name).cloned()
    }

    pub fn notifier(&self, name: &str) -> Option<Arc<dyn NotifierPlugin>> {
        self.notifiers.get(name).cloned()
    }

    pub fn notifier_names(&self) -> Vec<String> {
        self.notifiers.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
