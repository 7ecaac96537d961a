use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot};
use runcast::exec::{CancelHandle, CommandRunner, CommandSpec, RunHandle, RunnerEvent};

/// One step of a scripted run.
#[derive(Debug, Clone)]
enum Step {
    Chunk(String),
    Delay(Duration),
    /// Block until the gate is opened (or the run is cancelled).
    Gate(Arc<Notify>),
}

#[derive(Debug, Clone)]
enum End {
    Exit(Option<i32>),
    Fail(String),
    UntilCancel,
    LaunchError(String),
}

/// What a fake process does once launched.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    steps: Vec<Step>,
    end: End,
    /// Exit code reported after a cancel; `None` mimics a signal.
    cancel_code: Option<i32>,
}

impl ScriptedRun {
    pub fn exits(code: i32) -> Self {
        Self {
            steps: Vec::new(),
            end: End::Exit(Some(code)),
            cancel_code: None,
        }
    }

    pub fn killed_by_signal() -> Self {
        Self {
            end: End::Exit(None),
            ..Self::exits(0)
        }
    }

    pub fn fails(error: &str) -> Self {
        Self {
            end: End::Fail(error.to_string()),
            ..Self::exits(0)
        }
    }

    pub fn launch_error(message: &str) -> Self {
        Self {
            end: End::LaunchError(message.to_string()),
            ..Self::exits(0)
        }
    }

    /// Runs until cancelled.
    pub fn until_cancel() -> Self {
        Self {
            end: End::UntilCancel,
            ..Self::exits(0)
        }
    }

    pub fn chunk(mut self, text: &str) -> Self {
        self.steps.push(Step::Chunk(text.to_string()));
        self
    }

    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Delay(duration));
        self
    }

    pub fn gate(mut self, gate: &Arc<Notify>) -> Self {
        self.steps.push(Step::Gate(Arc::clone(gate)));
        self
    }

    pub fn cancel_code(mut self, code: Option<i32>) -> Self {
        self.cancel_code = code;
        self
    }
}

/// A fake `CommandRunner` that:
/// - records every spec it was asked to launch
/// - plays the first script whose pattern occurs in the spec's command line
///   (or the default script, a silent exit 0).
pub struct FakeRunner {
    rules: Mutex<Vec<(String, ScriptedRun)>>,
    default: Mutex<ScriptedRun>,
    launched: Arc<Mutex<Vec<CommandSpec>>>,
    next_pid: AtomicU32,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default: Mutex::new(ScriptedRun::exits(0)),
            launched: Arc::new(Mutex::new(Vec::new())),
            next_pid: AtomicU32::new(1000),
        }
    }

    /// Script for commands whose display line contains `pattern`.
    pub fn on(self, pattern: &str, script: ScriptedRun) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((pattern.to_string(), script));
        self
    }

    pub fn with_default(self, script: ScriptedRun) -> Self {
        *self.default.lock().unwrap() = script;
        self
    }

    pub fn launched(&self) -> Vec<CommandSpec> {
        self.launched.lock().unwrap().clone()
    }

    pub fn launched_lines(&self) -> Vec<String> {
        self.launched().iter().map(CommandSpec::display_line).collect()
    }

    fn script_for(&self, spec: &CommandSpec) -> ScriptedRun {
        let line = spec.display_line();
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| self.default.lock().unwrap().clone())
    }
}

impl CommandRunner for FakeRunner {
    fn launch(&self, spec: &CommandSpec) -> io::Result<RunHandle> {
        self.launched.lock().unwrap().push(spec.clone());
        let script = self.script_for(spec);

        if let End::LaunchError(message) = &script.end {
            return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
        }

        let (tx, rx) = mpsc::channel(64);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(play(script, tx, cancel_rx));

        Ok(RunHandle {
            pid: Some(self.next_pid.fetch_add(1, Ordering::Relaxed)),
            events: rx,
            cancel: CancelHandle::new(cancel_tx),
        })
    }
}

async fn play(
    script: ScriptedRun,
    tx: mpsc::Sender<RunnerEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let cancelled = RunnerEvent::Exited {
        code: script.cancel_code,
    };

    for step in script.steps {
        match step {
            Step::Chunk(text) => {
                let _ = tx.send(RunnerEvent::Output(text)).await;
            }
            Step::Delay(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = &mut cancel_rx => {
                        let _ = tx.send(cancelled).await;
                        return;
                    }
                }
            }
            Step::Gate(gate) => {
                tokio::select! {
                    _ = gate.notified() => {}
                    _ = &mut cancel_rx => {
                        let _ = tx.send(cancelled).await;
                        return;
                    }
                }
            }
        }
    }

    let last = match script.end {
        End::Exit(code) => RunnerEvent::Exited { code },
        End::Fail(error) => RunnerEvent::Failed(error),
        End::UntilCancel => {
            let _ = cancel_rx.await;
            cancelled
        }
        End::LaunchError(_) => return,
    };
    let _ = tx.send(last).await;
}
