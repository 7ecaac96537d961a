// src/registry/mod.rs

//! Process registry: the single owner of run records.
//!
//! - [`run`] defines run identity, state and snapshots.
//! - [`store`] holds the `ProcessRegistry` itself: creation, lookup,
//!   cancellation and eviction.
//! - [`pump`] is the per-run task that frames runner output into the log.
//!
//! Every change to a run's log is published on that run's broadcast channel
//! as a [`RunEvent`] while the registry lock is held, so a subscriber that
//! takes a replay snapshot and subscribes under the same lock sees neither
//! gaps nor duplicates.

use std::time::Duration;

use crate::output::AppliedOp;

pub mod pump;
pub mod run;
pub mod store;

pub use run::{RunId, RunSnapshot, RunState, RunSummary};
pub use store::{ProcessRegistry, ReplayPoint};

/// Change published for one run. `seq` increases by one per event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Line { seq: u64, line: AppliedOp },
    Finished { seq: u64, state: RunState },
}

impl RunEvent {
    pub fn seq(&self) -> u64 {
        match self {
            RunEvent::Line { seq, .. } | RunEvent::Finished { seq, .. } => *seq,
        }
    }
}

/// Bounds on what the registry keeps in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    /// Framed lines kept per run.
    pub log_capacity: usize,
    /// Total runs kept; the oldest terminal run is evicted beyond this.
    pub max_runs: usize,
    /// How long a terminal run stays queryable.
    pub retention: Duration,
    /// Per-run broadcast buffer before slow viewers lag and resync.
    pub event_buffer: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            log_capacity: 5000,
            max_runs: 64,
            retention: Duration::from_secs(30 * 60),
            event_buffer: 1024,
        }
    }
}
