// src/install/progress.rs

//! Running one orchestration step as a registry run and reporting progress.

use anyhow::anyhow;

use crate::broadcast::{Broadcaster, StreamEvent};
use crate::errors::{Result, RuncastError};
use crate::exec::CommandSpec;
use crate::registry::{RunId, RunState};

/// Receives step banners and the live events of every run an orchestrator
/// starts.
pub trait ProgressSink: Send + Sync {
    /// A human-readable step banner, e.g. `Attempt 1/3: pip (official pypi.org)`.
    fn step(&self, message: &str);

    /// One live event of the run currently executing.
    fn event(&self, run_id: &RunId, event: &StreamEvent) {
        let _ = (run_id, event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn step(&self, _message: &str) {}
}

/// A finished step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRun {
    pub run_id: RunId,
    pub program: String,
    pub state: RunState,
}

impl StepRun {
    pub fn succeeded(&self) -> bool {
        self.state.is_success()
    }

    /// Turn an unsuccessful terminal state into an error.
    pub fn check(&self) -> Result<()> {
        match &self.state {
            state if state.is_success() => Ok(()),
            RunState::Exited { code: Some(code) } => Err(RuncastError::NonZeroExit {
                program: self.program.clone(),
                code: *code,
            }),
            state => Err(RuncastError::Other(anyhow!(
                "'{}' {}",
                self.program,
                state
                    .failure_reason()
                    .unwrap_or_else(|| state.name().to_string())
            ))),
        }
    }
}

/// Launch `spec` as a registry run, forward its events to `sink` and wait
/// for the terminal state.
///
/// A launch failure is returned as `RuncastError::Launch`; every other
/// outcome is reported through the returned [`StepRun`].
pub async fn run_step(
    broadcaster: &Broadcaster,
    spec: CommandSpec,
    sink: &dyn ProgressSink,
) -> Result<StepRun> {
    let program = spec.program.clone();
    let run_id = broadcaster.registry().create_run(spec)?;
    let mut subscription = broadcaster.attach(&run_id, None)?;

    while let Some(event) = subscription.next().await {
        sink.event(&run_id, &event);
    }

    let state = match subscription.terminal_state() {
        Some(state) => state.clone(),
        None => broadcaster.registry().state(&run_id)?,
    };

    Ok(StepRun {
        run_id,
        program,
        state,
    })
}
