// src/broadcast/mod.rs

//! Fan-out of run events to live viewers.
//!
//! A viewer attaches to a run with an optional cursor. It first receives the
//! buffered lines from that cursor (full replay when omitted), then every
//! later append/overwrite exactly once and in framer order, and finally one
//! `Exit` event after which the feed is closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::errors::Result;
use crate::registry::{ProcessRegistry, RunId, RunState};

pub mod subscription;

pub use subscription::Subscription;

/// Whether an output event adds a line or replaces the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineOp {
    Append,
    Overwrite,
}

/// One event as delivered to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Output {
        op: LineOp,
        index: u64,
        data: String,
    },
    /// Final event. `code` is absent when the process was killed by a signal
    /// or never started.
    Exit {
        state: String,
        code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl StreamEvent {
    pub fn exit(state: &RunState) -> Self {
        let error = match state {
            RunState::Failed { error } => Some(error.clone()),
            _ => None,
        };
        StreamEvent::Exit {
            state: state.name().to_string(),
            code: state.exit_code(),
            error,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, StreamEvent::Exit { .. })
    }
}

/// Attaches viewers to runs held by a [`ProcessRegistry`].
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: ProcessRegistry,
    viewers: Arc<Mutex<HashMap<RunId, usize>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            viewers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Open a live feed for `run_id`, replaying from `from_cursor` (or from
    /// the start of the buffered log).
    pub fn attach(&self, run_id: &RunId, from_cursor: Option<u64>) -> Result<Subscription> {
        let point = self.registry.replay_point(run_id, from_cursor.unwrap_or(0))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        *self.viewers.lock().entry(run_id.clone()).or_insert(0) += 1;
        debug!(
            run_id = %run_id,
            subscription = id,
            replay = point.lines.len(),
            "viewer attached"
        );

        Ok(Subscription::new(
            id,
            run_id.clone(),
            point,
            self.registry.clone(),
            Arc::clone(&self.viewers),
        ))
    }

    /// Release a subscription. Calling it again is a no-op.
    pub fn detach(&self, subscription: &mut Subscription) {
        subscription.detach();
    }

    /// Number of attached viewers for a run.
    pub fn viewer_count(&self, run_id: &RunId) -> usize {
        self.viewers.lock().get(run_id).copied().unwrap_or(0)
    }
}
