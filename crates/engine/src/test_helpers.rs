// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for engine tests: an engine wired to fakes with one
//! project ("app") configured.
#![allow(clippy::unwrap_used)]

use crate::engine::{EngineDeps, LifecycleEngine};
use crate::metadata::FsMetadataStore;
use fleet_core::test_support::project;
use fleet_core::{
    config::PluginRef, FakeClock, OrchestratorConfig, ReactionAction, ReactionConfig, SessionId,
};
use fleet_plugins::{
    FakeAgent, FakeNotifier, FakeRuntime, FakeScm, FakeSessionManager, FakeTracker, PluginRegistry,
};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Harness {
    pub engine: Arc<LifecycleEngine<FakeClock>>,
    pub clock: FakeClock,
    pub runtime: FakeRuntime,
    pub agent: FakeAgent,
    pub scm: FakeScm,
    pub tracker: FakeTracker,
    pub notifier: FakeNotifier,
    pub manager: FakeSessionManager,
    pub metadata: Arc<FsMetadataStore>,
    _tmp: tempfile::TempDir,
}

impl Harness {
    pub async fn meta(&self, id: &str) -> HashMap<String, String> {
        use crate::metadata::MetadataStore;
        self.metadata.read(&SessionId::new(id)).await.unwrap()
    }
}

pub struct HarnessBuilder {
    config: OrchestratorConfig,
    agent: FakeAgent,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        let mut config = OrchestratorConfig::default();
        let mut app = project("app");
        app.runtime = Some("tmux".to_string());
        app.agent = Some("claude".to_string());
        app.scm = Some(PluginRef {
            plugin: "github".to_string(),
        });
        app.tracker = Some(PluginRef {
            plugin: "tracker".to_string(),
        });
        config.projects.insert("app".to_string(), app);
        config.defaults.notifiers = vec!["fake".to_string()];
        Self {
            config,
            agent: FakeAgent::new(),
        }
    }

    /// Mutate the config before the engine is built.
    pub fn config(mut self, f: impl FnOnce(&mut OrchestratorConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Add a global reaction.
    pub fn reaction(mut self, key: &str, config: ReactionConfig) -> Self {
        self.config.reactions.insert(key.to_string(), config);
        self
    }

    /// Swap the agent plugin (e.g. `FakeAgent::named("codex")`). The
    /// project's agent name follows the plugin name.
    pub fn agent(mut self, agent: FakeAgent) -> Self {
        use fleet_plugins::AgentPlugin;
        if let Some(app) = self.config.projects.get_mut("app") {
            app.agent = Some(agent.name().to_string());
        }
        self.agent = agent;
        self
    }

    pub fn build(self) -> Harness {
        use fleet_plugins::AgentPlugin;
        let tmp = tempfile::tempdir().unwrap();
        let clock = FakeClock::new();
        let runtime = FakeRuntime::new();
        let agent = self.agent;
        let scm = FakeScm::new();
        let tracker = FakeTracker::new();
        let notifier = FakeNotifier::new();
        let manager = FakeSessionManager::new();
        let metadata = Arc::new(FsMetadataStore::new(tmp.path()));

        let mut registry = PluginRegistry::new();
        registry
            .register_runtime("tmux", Arc::new(runtime.clone()))
            .register_agent(agent.name(), Arc::new(agent.clone()))
            .register_scm("github", Arc::new(scm.clone()))
            .register_tracker("tracker", Arc::new(tracker.clone()))
            .register_notifier("fake", Arc::new(notifier.clone()));

        let engine = LifecycleEngine::new(
            self.config,
            EngineDeps {
                registry,
                sessions: Arc::new(manager.clone()),
                metadata: metadata.clone(),
            },
            clock.clone(),
        );

        Harness {
            engine,
            clock,
            runtime,
            agent,
            scm,
            tracker,
            notifier,
            manager,
            metadata,
            _tmp: tmp,
        }
    }
}

/// Default harness: one project, no reactions configured.
pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}

/// A send-to-agent reaction config.
pub fn send_to_agent(message: Option<&str>) -> ReactionConfig {
    ReactionConfig {
        message: message.map(str::to_string),
        ..ReactionConfig::simple(ReactionAction::SendToAgent)
    }
}
