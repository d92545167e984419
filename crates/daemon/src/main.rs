// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet daemon (fleetd)
//!
//! Background process that supervises agent sessions: it polls every live
//! session on an interval, classifies lifecycle status from plugin probes,
//! and runs configured reactions on transitions.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::sync::Arc;

use fleet_core::SystemClock;
use fleet_engine::{EngineDeps, FsMetadataStore, LifecycleEngine};
use fleet_plugins::NoopSessionManager;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{LifecycleError, Paths};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fleetd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fleetd {}", env!("CARGO_PKG_VERSION"));
                println!("Fleet daemon - supervises AI coding-agent sessions");
                println!();
                println!("USAGE:");
                println!("    fleetd");
                println!();
                println!("Configuration is read from $FLEET_CONFIG or");
                println!("~/.config/fleet/config.toml at startup.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fleetd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let paths = Paths::resolve()?;

    archive_oversized_log(&paths.log_path);
    let log_guard = init_tracing(&paths)?;

    // Single-instance lock before any engine state is touched.
    let _lock = match lifecycle::acquire_lock(&paths) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(path)) => {
            let pid = std::fs::read_to_string(&paths.pid_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("fleetd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            eprintln!("  lock: {}", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to acquire lock: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let config = lifecycle::load_config(&paths)?;
    info!(
        projects = config.projects.len(),
        interval_ms = config.interval_ms,
        "starting fleetd"
    );

    let registry = lifecycle::build_registry(&config);
    let metadata = Arc::new(FsMetadataStore::new(config.sessions_dir.clone()));
    let engine = LifecycleEngine::new(
        config,
        EngineDeps {
            registry,
            // The session manager is deployment-provided; without one the
            // daemon idles over an empty fleet.
            sessions: Arc::new(NoopSessionManager),
            metadata,
        },
        SystemClock,
    );

    engine.start();
    info!("fleetd ready");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    // Cancels the interval and drains the in-flight poll cycle.
    engine.stop().await;
    info!("fleetd stopped");
    Ok(())
}

/// A log file past this size is archived at startup before logging begins.
const LOG_ARCHIVE_BYTES: u64 = 10 * 1024 * 1024;

/// Archive an oversized daemon log.
///
/// Exactly one previous generation is kept: the oversized file replaces
/// `daemon.log.prev` and the daemon starts on a fresh file. Archival is
/// best-effort; an unarchivable log never blocks startup.
fn archive_oversized_log(log_path: &std::path::Path) {
    let oversized = std::fs::metadata(log_path).is_ok_and(|m| m.len() >= LOG_ARCHIVE_BYTES);
    if oversized {
        let _ = std::fs::rename(log_path, log_path.with_extension("log.prev"));
    }
}

/// Install the tracing subscriber: non-blocking writes appended to the
/// daemon log, `RUST_LOG`-filtered, defaulting to `info`. The returned
/// guard flushes buffered lines on drop and must outlive the daemon.
fn init_tracing(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::EnvFilter;

    if let Some(dir) = paths.log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
