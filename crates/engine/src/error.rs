// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the lifecycle engine

use fleet_plugins::PluginError;
use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("metadata io error: {0}")]
    MetadataIo(#[from] std::io::Error),
    #[error("metadata parse error: {0}")]
    MetadataParse(#[from] toml::de::Error),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
}
