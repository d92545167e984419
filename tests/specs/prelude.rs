//! Test helpers for behavioral specifications.
//!
//! Builds a lifecycle engine wired to fake plugins with one project
//! ("app") configured, and offers session builders matching what a real
//! session manager would report.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use fleet_core::config::PluginRef;
use fleet_core::test_support::project;
use fleet_core::{
    FakeClock, OrchestratorConfig, ReactionAction, ReactionConfig, Session, SessionId,
};
use fleet_engine::{EngineDeps, FsMetadataStore, LifecycleEngine, MetadataStore};
use fleet_plugins::{
    AgentPlugin, FakeAgent, FakeNotifier, FakeRuntime, FakeScm, FakeSessionManager, FakeTracker,
    PluginRegistry, SessionManager,
};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Fleet {
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

impl Fleet {
    /// Read a session's sidecar metadata.
    pub async fn meta(&self, id: &str) -> HashMap<String, String> {
        self.metadata.read(&SessionId::new(id)).await.unwrap()
    }

    /// Fold the sidecar metadata back into the manager's session snapshot,
    /// as a real session manager does between cycles.
    pub async fn refresh_session(&self, id: &str) {
        let sid = SessionId::new(id);
        let Some(mut session) = self.manager.get(&sid).await.unwrap() else {
            return;
        };
        for (key, value) in self.meta(id).await {
            session.metadata.insert(key, value);
        }
        self.manager.remove_session(&sid);
        self.manager.add_session(session);
    }

    /// Run one poll cycle.
    pub async fn poll(&self) {
        self.engine.poll_all().await;
    }
}

pub struct FleetBuilder {
    config: OrchestratorConfig,
    agent: FakeAgent,
}

impl FleetBuilder {
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

    pub fn config(mut self, f: impl FnOnce(&mut OrchestratorConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn reaction(mut self, key: &str, config: ReactionConfig) -> Self {
        self.config.reactions.insert(key.to_string(), config);
        self
    }

    pub fn agent(mut self, agent: FakeAgent) -> Self {
        if let Some(app) = self.config.projects.get_mut("app") {
            app.agent = Some(agent.name().to_string());
        }
        self.agent = agent;
        self
    }

    pub fn build(self) -> Fleet {
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

        Fleet {
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

pub fn fleet() -> Fleet {
    FleetBuilder::new().build()
}

/// A live working-state session as the manager would report it, with its
/// runtime handle registered and producing output.
pub fn active_session(f: &Fleet, id: &str, output: &str) -> Session {
    let mut s = fleet_core::test_support::live_session(id, "app");
    let handle = s.runtime_handle.clone().unwrap();
    f.runtime.add_handle(&handle);
    f.runtime.set_output(&handle, output);
    s.status = fleet_core::SessionStatus::Working;
    s
}

pub fn send_to_agent(message: &str) -> ReactionConfig {
    ReactionConfig {
        message: Some(message.to_string()),
        ..ReactionConfig::simple(ReactionAction::SendToAgent)
    }
}
