// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup plumbing: path resolution, configuration, lock file, and
//! plugin registry construction.

use fleet_core::OrchestratorConfig;
use fleet_plugins::{DesktopNotifier, NoopNotifier, PluginRegistry};
use fs2::FileExt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("another fleetd holds the lock at {0}")]
    LockFailed(PathBuf),
    #[error("no home directory available")]
    NoHomeDir,
}

/// Filesystem locations the daemon uses.
pub struct Paths {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
    pub pid_path: PathBuf,
}

impl Paths {
    /// Resolve paths: `FLEET_CONFIG` overrides the config location; state
    /// lives under `~/.local/state/fleet`.
    pub fn resolve() -> Result<Self, LifecycleError> {
        let config_path = match std::env::var_os("FLEET_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .ok_or(LifecycleError::NoHomeDir)?
                .join("fleet")
                .join("config.toml"),
        };
        let state_dir = dirs::state_dir()
            .or_else(dirs::home_dir)
            .ok_or(LifecycleError::NoHomeDir)?
            .join("fleet");
        Ok(Self {
            config_path,
            log_path: state_dir.join("daemon.log"),
            lock_path: state_dir.join("fleetd.lock"),
            pid_path: state_dir.join("fleetd.pid"),
        })
    }
}

/// Load the orchestrator config. A missing file starts an idle daemon with
/// defaults rather than failing startup.
pub fn load_config(paths: &Paths) -> Result<OrchestratorConfig, LifecycleError> {
    match std::fs::read_to_string(&paths.config_path) {
        Ok(text) => Ok(OrchestratorConfig::from_toml(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(
                config = %paths.config_path.display(),
                "config file not found, starting with defaults"
            );
            Ok(OrchestratorConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Take the exclusive daemon lock and record our pid. The returned file
/// must be kept alive for the daemon's lifetime.
pub fn acquire_lock(paths: &Paths) -> Result<File, LifecycleError> {
    if let Some(parent) = paths.lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(&paths.lock_path)?;
    if file.try_lock_exclusive().is_err() {
        return Err(LifecycleError::LockFailed(paths.lock_path.clone()));
    }
    std::fs::write(&paths.pid_path, std::process::id().to_string())?;
    Ok(file)
}

/// Build the plugin registry from the built-in adapters.
///
/// Runtime/agent/SCM/tracker implementations are external processes wired
/// in by deployment; names referenced in config that resolve to nothing are
/// reported so a misconfiguration is visible at startup rather than as a
/// silent dead project.
pub fn build_registry(config: &OrchestratorConfig) -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register_notifier("desktop", Arc::new(DesktopNotifier::new()))
        .register_notifier("noop", Arc::new(NoopNotifier));

    let mut wanted: Vec<&str> = config.defaults.notifiers.iter().map(String::as_str).collect();
    for names in [
        &config.notification_routing.urgent,
        &config.notification_routing.action,
        &config.notification_routing.warning,
        &config.notification_routing.info,
    ] {
        wanted.extend(names.iter().map(String::as_str));
    }
    for name in wanted {
        if registry.notifier(name).is_none() {
            tracing::warn!(notifier = name, "configured notifier is not registered");
        }
    }

    for (project_id, project) in &config.projects {
        for (slot, name) in [
            ("runtime", project.runtime.as_deref().or(config.defaults.runtime.as_deref())),
            ("agent", project.agent.as_deref().or(config.defaults.agent.as_deref())),
            ("scm", project.scm.as_ref().map(|r| r.plugin.as_str())),
            ("tracker", project.tracker.as_ref().map(|r| r.plugin.as_str())),
        ] {
            if let Some(name) = name {
                let registered = match slot {
                    "runtime" => registry.runtime(name).is_some(),
                    "agent" => registry.agent(name).is_some(),
                    "scm" => registry.scm(name).is_some(),
                    _ => registry.tracker(name).is_some(),
                };
                if !registered {
                    tracing::warn!(
                        project = %project_id,
                        slot,
                        plugin = name,
                        "configured plugin is not registered; probes for it are skipped"
                    );
                }
            }
        }
    }

    registry
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
