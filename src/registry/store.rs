// src/registry/store.rs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, RuncastError};
use crate::exec::{CancelHandle, CommandRunner, CommandSpec};
use crate::output::{FrameOp, LogLine, OutputLog};

use super::pump::pump_events;
use super::run::{RunId, RunSnapshot, RunState, RunSummary};
use super::{RegistryLimits, RunEvent};

/// Internal record; never leaves the registry.
struct RunRecord {
    spec: CommandSpec,
    state: RunState,
    pid: Option<u32>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    /// Monotonic end time used for retention.
    ended: Option<Instant>,
    log: OutputLog,
    seq: u64,
    events: broadcast::Sender<RunEvent>,
    cancel: Option<CancelHandle>,
    cancel_requested: bool,
}

impl RunRecord {
    fn publish_line(&mut self, op: &FrameOp) {
        let line = self.log.apply(op);
        self.seq += 1;
        // No receivers is fine: nobody is watching.
        let _ = self.events.send(RunEvent::Line {
            seq: self.seq,
            line,
        });
    }

    fn finish(&mut self, state: RunState, status_ops: Vec<FrameOp>) {
        for op in &status_ops {
            self.publish_line(op);
        }
        self.state = state.clone();
        self.ended_at = Some(Utc::now());
        self.ended = Some(Instant::now());
        self.cancel = None;
        self.seq += 1;
        let _ = self.events.send(RunEvent::Finished {
            seq: self.seq,
            state,
        });
    }

    fn snapshot(&self, id: &RunId) -> RunSnapshot {
        RunSnapshot {
            id: id.clone(),
            command: self.spec.clone(),
            state: self.state.clone(),
            pid: self.pid,
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            first_line_index: self.log.first_index(),
            line_count: self.log.len(),
            lines: self.log.texts(),
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    runs: HashMap<RunId, RunRecord>,
    /// Creation order, oldest first.
    order: VecDeque<RunId>,
}

impl RegistryInner {
    fn remove(&mut self, id: &RunId) {
        self.runs.remove(id);
        self.order.retain(|other| other != id);
    }

    /// Drop terminal runs whose retention window has passed.
    fn sweep_expired(&mut self, retention: Duration, now: Instant) -> usize {
        let expired: Vec<RunId> = self
            .runs
            .iter()
            .filter(|(_, rec)| {
                rec.ended
                    .is_some_and(|ended| now.saturating_duration_since(ended) >= retention)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            debug!(run_id = %id, "evicting run after retention window");
            self.remove(id);
        }
        expired.len()
    }

    /// Enforce the total-run cap by evicting the oldest terminal runs.
    /// Live runs are never evicted, so the cap can be exceeded temporarily.
    fn enforce_cap(&mut self, max_runs: usize) {
        while self.runs.len() > max_runs {
            let oldest_terminal = self
                .order
                .iter()
                .find(|id| self.runs.get(*id).is_some_and(|rec| rec.state.is_terminal()))
                .cloned();

            match oldest_terminal {
                Some(id) => {
                    debug!(run_id = %id, "evicting oldest terminal run (run cap reached)");
                    self.remove(&id);
                }
                None => {
                    warn!(
                        runs = self.runs.len(),
                        max_runs, "run cap exceeded but every run is still live"
                    );
                    break;
                }
            }
        }
    }
}

/// Where a new subscriber starts: the replayed lines and the event sequence
/// number they reflect, taken atomically with the live subscription.
#[derive(Debug)]
pub struct ReplayPoint {
    pub lines: Vec<LogLine>,
    /// Log length after the replayed lines.
    pub len: u64,
    pub seq: u64,
    /// Set when the run had already finished.
    pub terminal: Option<RunState>,
    pub receiver: broadcast::Receiver<RunEvent>,
}

/// Owns every run record and launches commands through a `CommandRunner`.
///
/// Cloning is cheap and shares the same state. The runner is only ever
/// handed a spec; output flows back through a pump task that writes into
/// the record, so the registry remains the single writer of run state.
#[derive(Clone)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<RegistryInner>>,
    runner: Arc<dyn CommandRunner>,
    limits: RegistryLimits,
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl ProcessRegistry {
    pub fn new(runner: Arc<dyn CommandRunner>, limits: RegistryLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::default())),
            runner,
            limits,
        }
    }

    pub fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Create a run and launch its command.
    ///
    /// Returns once the process has started; output and exit are recorded in
    /// the background. A launch failure leaves the run recorded as `Failed`
    /// and is returned as [`RuncastError::Launch`].
    pub fn create_run(&self, spec: CommandSpec) -> Result<RunId> {
        let id = RunId::new();
        let (events, _) = broadcast::channel(self.limits.event_buffer.max(1));

        {
            let mut inner = self.inner.lock();
            inner.sweep_expired(self.limits.retention, Instant::now());
            inner.runs.insert(
                id.clone(),
                RunRecord {
                    spec: spec.clone(),
                    state: RunState::Pending,
                    pid: None,
                    created_at: Utc::now(),
                    started_at: None,
                    ended_at: None,
                    ended: None,
                    log: OutputLog::new(self.limits.log_capacity),
                    seq: 0,
                    events,
                    cancel: None,
                    cancel_requested: false,
                },
            );
            inner.order.push_back(id.clone());
            inner.enforce_cap(self.limits.max_runs);
        }

        info!(run_id = %id, command = %spec, "run created");

        match self.runner.launch(&spec) {
            Ok(handle) => {
                {
                    let mut inner = self.inner.lock();
                    if let Some(rec) = inner.runs.get_mut(&id) {
                        rec.state = RunState::Running;
                        rec.pid = handle.pid;
                        rec.started_at = Some(Utc::now());
                        rec.cancel = Some(handle.cancel);
                    }
                }
                debug!(run_id = %id, pid = ?handle.pid, "run is running");
                tokio::spawn(pump_events(self.clone(), id.clone(), handle.events));
                Ok(id)
            }
            Err(source) => {
                warn!(run_id = %id, program = %spec.program, error = %source, "launch failed");
                let error = format!("failed to launch '{}': {source}", spec.program);
                let status = vec![FrameOp::Append(error.clone())];
                self.finish_run(&id, RunState::Failed { error }, status);
                Err(RuncastError::Launch {
                    run_id: id,
                    program: spec.program,
                    cwd: spec
                        .cwd
                        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default()),
                    source,
                })
            }
        }
    }

    /// Current state and buffered output of a run.
    pub fn get_run(&self, id: &RunId) -> Result<RunSnapshot> {
        let mut inner = self.inner.lock();
        inner.sweep_expired(self.limits.retention, Instant::now());
        inner
            .runs
            .get(id)
            .map(|rec| rec.snapshot(id))
            .ok_or_else(|| RuncastError::NotFound(id.clone()))
    }

    pub fn state(&self, id: &RunId) -> Result<RunState> {
        let mut inner = self.inner.lock();
        inner.sweep_expired(self.limits.retention, Instant::now());
        inner
            .runs
            .get(id)
            .map(|rec| rec.state.clone())
            .ok_or_else(|| RuncastError::NotFound(id.clone()))
    }

    /// All known runs, oldest first.
    pub fn list_runs(&self) -> Vec<RunSummary> {
        let mut inner = self.inner.lock();
        inner.sweep_expired(self.limits.retention, Instant::now());
        inner
            .order
            .iter()
            .filter_map(|id| {
                inner.runs.get(id).map(|rec| RunSummary {
                    id: id.clone(),
                    command: rec.spec.display_line(),
                    state: rec.state.clone(),
                    created_at: rec.created_at,
                    ended_at: rec.ended_at,
                })
            })
            .collect()
    }

    /// Ask a live run to terminate.
    ///
    /// The run stays `Running` until the process really exits, then becomes
    /// `Cancelled` with the real exit code. Cancelling a terminal run is an
    /// `InvalidState` error with no side effect; repeating a pending request
    /// is a no-op.
    pub fn cancel_run(&self, id: &RunId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.sweep_expired(self.limits.retention, Instant::now());
        let rec = inner
            .runs
            .get_mut(id)
            .ok_or_else(|| RuncastError::NotFound(id.clone()))?;

        if rec.state.is_terminal() {
            return Err(RuncastError::InvalidState {
                run_id: id.clone(),
                state: rec.state.name().to_string(),
            });
        }

        if rec.cancel_requested {
            debug!(run_id = %id, "cancellation already requested");
            return Ok(());
        }

        match rec.cancel.as_mut() {
            Some(handle) => {
                if !handle.cancel() {
                    debug!(run_id = %id, "process already exiting; cancel not delivered");
                }
                rec.cancel_requested = true;
                info!(run_id = %id, "cancellation requested");
                Ok(())
            }
            None => Err(RuncastError::InvalidState {
                run_id: id.clone(),
                state: rec.state.name().to_string(),
            }),
        }
    }

    /// Snapshot lines from `cursor` and subscribe to later events atomically.
    ///
    /// `cursor` is clamped to the current log length.
    pub fn replay_point(&self, id: &RunId, cursor: u64) -> Result<ReplayPoint> {
        let mut inner = self.inner.lock();
        inner.sweep_expired(self.limits.retention, Instant::now());
        let rec = inner
            .runs
            .get(id)
            .ok_or_else(|| RuncastError::NotFound(id.clone()))?;

        let len = rec.log.len();
        let cursor = cursor.min(len);
        Ok(ReplayPoint {
            lines: rec.log.lines_from(cursor),
            len,
            seq: rec.seq,
            terminal: rec.state.is_terminal().then(|| rec.state.clone()),
            receiver: rec.events.subscribe(),
        })
    }

    /// Evict expired terminal runs now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.inner
            .lock()
            .sweep_expired(self.limits.retention, Instant::now())
    }

    /// Spawn the periodic eviction loop.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = registry.sweep();
                if evicted > 0 {
                    debug!(evicted, "registry sweep");
                }
            }
        })
    }

    pub(crate) fn append_ops(&self, id: &RunId, ops: &[FrameOp]) {
        if ops.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        if let Some(rec) = inner.runs.get_mut(id) {
            for op in ops {
                rec.publish_line(op);
            }
        }
    }

    /// Move a run into its terminal state, appending the status lines first.
    pub(crate) fn finish_run(&self, id: &RunId, state: RunState, status_ops: Vec<FrameOp>) {
        let mut inner = self.inner.lock();
        if let Some(rec) = inner.runs.get_mut(id) {
            if rec.state.is_terminal() {
                warn!(run_id = %id, "ignoring second terminal transition");
                return;
            }
            info!(run_id = %id, state = %state, "run finished");
            rec.finish(state, status_ops);
        }
    }

    /// Record a process exit. The run becomes `Cancelled` when termination
    /// had been requested, `Exited` otherwise; decided under the same lock
    /// that `cancel_run` takes.
    pub(crate) fn finish_exited(&self, id: &RunId, code: Option<i32>, status_ops: Vec<FrameOp>) {
        let mut inner = self.inner.lock();
        if let Some(rec) = inner.runs.get_mut(id) {
            if rec.state.is_terminal() {
                warn!(run_id = %id, "ignoring second terminal transition");
                return;
            }
            let state = if rec.cancel_requested {
                RunState::Cancelled { code }
            } else {
                RunState::Exited { code }
            };
            info!(run_id = %id, state = %state, "run finished");
            rec.finish(state, status_ops);
        }
    }
}
