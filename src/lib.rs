//! Blueprint - a living project-planning document engine.
//!
//! This library provides the core functionality for the `bp` CLI tool: a
//! round-trip engine between a structured project model (epics, capabilities,
//! stories, dependencies, milestones, architecture) and a small set of
//! markdown documents with embedded diagram text. Documents stay
//! human-editable: each one carries a machine-owned generated region and a
//! human-owned notes region, and incremental patches are reconciled into the
//! existing model under an explicit conflict policy.

pub mod assemble;
pub mod cli;
pub mod commands;
pub mod docset;
pub mod markers;
pub mod merge;
pub mod models;
pub mod parse;
pub mod regions;
pub mod render;
pub mod run_log;

/// Library-level error type for Blueprint operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Blueprint operations.
pub type Result<T> = std::result::Result<T, Error>;
