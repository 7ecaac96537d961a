// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RunId;

/// One failed fallback attempt, kept for the aggregate report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub label: String,
    pub error: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

#[derive(Error, Debug)]
pub enum RuncastError {
    #[error("Failed to launch '{program}' in {cwd:?} (run {run_id}): {source}")]
    Launch {
        run_id: RunId,
        program: String,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code}")]
    NonZeroExit { program: String, code: i32 },

    #[error("Run not found: {0}")]
    NotFound(RunId),

    #[error("Run {run_id} is {state}; operation not allowed")]
    InvalidState { run_id: RunId, state: String },

    #[error(
        "All {} install attempts failed for {target}; last error: {}",
        failures.len(),
        failures.last().map(|f| f.to_string()).unwrap_or_default()
    )]
    AggregateInstallFailure {
        target: String,
        failures: Vec<AttemptFailure>,
    },

    #[error("Update aborted at step '{step}': {reason}")]
    UpdateAborted { step: String, reason: String },

    #[error("No git repository found at {0:?}")]
    NoGitRepository(PathBuf),

    #[error("No package manager found: {0}")]
    NoPackageManager(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RuncastError>;
