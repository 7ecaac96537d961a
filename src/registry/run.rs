// src/registry/run.rs

//! Run identity, lifecycle state and read-only snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exec::CommandSpec;

/// Opaque run identifier. Freshly generated per run and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty run id".to_string());
        }
        Ok(Self(s.to_string()))
    }
}

/// Lifecycle of a run.
///
/// `Pending → Running → Exited | Failed | Cancelled`. Terminal states are
/// final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunState {
    Pending,
    Running,
    /// The process ended on its own. `code` is `None` when a signal killed it.
    Exited { code: Option<i32> },
    /// Launch failed, or the exit status could not be collected.
    Failed { error: String },
    /// Termination was requested and the process has actually exited.
    Cancelled { code: Option<i32> },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }

    /// Only a natural exit with code 0 counts as success.
    pub fn is_success(&self) -> bool {
        matches!(self, RunState::Exited { code: Some(0) })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunState::Exited { code } | RunState::Cancelled { code } => *code,
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Exited { .. } => "exited",
            RunState::Failed { .. } => "failed",
            RunState::Cancelled { .. } => "cancelled",
        }
    }

    /// Human-readable reason a finished run did not succeed.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            RunState::Exited { code: Some(0) } => None,
            RunState::Exited { code: Some(code) } => Some(format!("exited with code {code}")),
            RunState::Exited { code: None } => Some("terminated by signal".to_string()),
            RunState::Failed { error } => Some(error.clone()),
            RunState::Cancelled { .. } => Some("cancelled".to_string()),
            RunState::Pending | RunState::Running => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Exited { code: Some(code) } => write!(f, "exited({code})"),
            RunState::Cancelled { code: Some(code) } => write!(f, "cancelled({code})"),
            RunState::Failed { error } => write!(f, "failed({error})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Point-in-time copy of a run, safe to hand out of the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub id: RunId,
    pub command: CommandSpec,
    pub state: RunState,
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Absolute index of `lines[0]`; non-zero once old lines were evicted.
    pub first_line_index: u64,
    /// Total lines ever produced.
    pub line_count: u64,
    pub lines: Vec<String>,
}

/// Compact listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: RunId,
    pub command: String,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}
