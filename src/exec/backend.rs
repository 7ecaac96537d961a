// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The registry talks to a `CommandRunner` instead of spawning processes
//! itself. Production code uses [`ProcessRunner`](super::process::ProcessRunner);
//! tests can provide a runner that replays scripted output without touching
//! the OS.

use std::io;

use tokio::sync::{mpsc, oneshot};

use super::command::CommandSpec;

/// Events reported by a launched command, in emission order.
///
/// `Output` chunks carry raw decoded text and do not respect line
/// boundaries. Exactly one terminal event (`Exited` or `Failed`) is sent, and
/// always after the last `Output` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Output(String),
    /// Reading one of the output pipes failed; the process may still be alive.
    StreamError(String),
    /// The process exited. `code` is `None` when it was killed by a signal.
    Exited { code: Option<i32> },
    /// The process was launched but its exit status could not be collected.
    Failed(String),
}

impl RunnerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunnerEvent::Exited { .. } | RunnerEvent::Failed(_))
    }
}

/// Requests termination of a launched command.
///
/// Cancelling only delivers the request; the real exit is still reported
/// through the event channel.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<oneshot::Sender<()>>,
}

impl CancelHandle {
    pub fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Returns `false` if a request was already sent or the command is gone.
    pub fn cancel(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// What the caller gets back from a successful launch.
#[derive(Debug)]
pub struct RunHandle {
    pub pid: Option<u32>,
    pub events: mpsc::Receiver<RunnerEvent>,
    pub cancel: CancelHandle,
}

/// Trait abstracting how commands are launched.
///
/// `launch` returns immediately. An `Err` means the command never started
/// (binary missing, permission denied) and must never be reported as an exit
/// code. Implementations must be called from within a Tokio runtime.
pub trait CommandRunner: Send + Sync {
    fn launch(&self, spec: &CommandSpec) -> io::Result<RunHandle>;
}
