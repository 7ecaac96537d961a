// src/registry/pump.rs

//! Per-run task that turns runner events into framed log lines.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::exec::RunnerEvent;
use crate::output::{FrameOp, OutputFramer};

use super::run::{RunId, RunState};
use super::store::ProcessRegistry;

/// Consume one run's runner events until the terminal event.
///
/// This is the only writer of the run's log. Chunks are framed and applied
/// in the order the runner delivered them.
pub async fn pump_events(
    registry: ProcessRegistry,
    id: RunId,
    mut events: mpsc::Receiver<RunnerEvent>,
) {
    let mut framer = OutputFramer::new();

    while let Some(event) = events.recv().await {
        match event {
            RunnerEvent::Output(chunk) => {
                let ops = framer.push(&chunk);
                registry.append_ops(&id, &ops);
            }
            RunnerEvent::StreamError(message) => {
                warn!(run_id = %id, error = %message, "output stream error");
            }
            RunnerEvent::Exited { code } => {
                let status = framer.finish(code);
                registry.finish_exited(&id, code, status);
                return;
            }
            RunnerEvent::Failed(error) => {
                let status = framer.finish_with(error.clone());
                registry.finish_run(&id, RunState::Failed { error }, status);
                return;
            }
        }
    }

    debug!(run_id = %id, "runner channel closed without a terminal event");
    let error = "output stream closed before the process reported an exit".to_string();
    registry.finish_run(
        &id,
        RunState::Failed {
            error: error.clone(),
        },
        vec![FrameOp::Append(error)],
    );
}
