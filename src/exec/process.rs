// src/exec/process.rs

//! OS process runner built on `tokio::process`.

use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{CancelHandle, CommandRunner, RunHandle, RunnerEvent};
use super::command::CommandSpec;
use super::decode::Utf8Decoder;
use super::resolve::{Launch, platform_launch};

const READ_CHUNK: usize = 8 * 1024;

/// How long output pumps may keep draining after the process exited.
///
/// Grandchildren that inherited the pipes can keep them open forever; past
/// this grace period the pumps are abandoned so the exit is still reported.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Production runner: one OS process per launch.
///
/// stdout and stderr are pumped by two tasks into one channel, so chunks
/// reach the consumer in the order they were read, and each stream's own
/// order is preserved.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    channel_capacity: usize,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ProcessRunner {
    fn launch(&self, spec: &CommandSpec) -> io::Result<RunHandle> {
        let (mut cmd, launch) = build_command(spec)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child.id();

        info!(
            program = %spec.program,
            pid = ?pid,
            cwd = ?spec.cwd,
            via_shell = launch.via_shell,
            "process launched"
        );

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(tokio::spawn(pump_stream(stdout, tx.clone(), "stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(tokio::spawn(pump_stream(stderr, tx.clone(), "stderr")));
        }

        tokio::spawn(supervise(
            child,
            pumps,
            tx,
            cancel_rx,
            spec.program.clone(),
            launch.via_shell,
        ));

        Ok(RunHandle {
            pid,
            events: rx,
            cancel: CancelHandle::new(cancel_tx),
        })
    }
}

/// Build the platform command. On Windows the program is resolved first;
/// only `.cmd`/`.bat` shims such as `npm.cmd` go through `cmd /C`.
fn build_command(spec: &CommandSpec) -> io::Result<(Command, Launch)> {
    let path_var = spec
        .env
        .get("PATH")
        .map(OsString::from)
        .or_else(|| std::env::var_os("PATH"));
    let launch = platform_launch(&spec.program, path_var.as_deref(), spec.cwd.as_deref())?;

    let mut cmd = launch.command(&spec.args);
    if let Some(ref dir) = spec.cwd {
        cmd.current_dir(dir);
    }
    cmd.envs(&spec.env);
    Ok((cmd, launch))
}

/// `cmd.exe` does not forward a kill to the shim's children, so the whole
/// tree is taken down by pid.
async fn kill_tree(child: &mut Child) -> io::Result<()> {
    match child.id() {
        Some(pid) => {
            let status = Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/T", "/F"])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await?;
            if status.success() {
                Ok(())
            } else {
                child.start_kill()
            }
        }
        None => Ok(()),
    }
}

/// Wait for the process to exit (or for a cancellation request), drain the
/// output pumps, then report the real exit status.
async fn supervise(
    mut child: Child,
    pumps: Vec<JoinHandle<()>>,
    tx: mpsc::Sender<RunnerEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
    program: String,
    via_shell: bool,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(program = %program, "cancellation requested; killing process");
                    let killed = if via_shell {
                        kill_tree(&mut child).await
                    } else {
                        child.start_kill()
                    };
                    if let Err(e) = killed {
                        warn!(program = %program, error = %e, "failed to kill process");
                    }
                }
                Err(_) => {
                    debug!(program = %program, "cancel handle dropped; waiting for natural exit");
                }
            }
            child.wait().await
        }
    };

    for pump in pumps {
        let abort = pump.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, pump).await.is_err() {
            warn!(program = %program, "output pipe still open after exit; abandoning it");
            abort.abort();
        }
    }

    let event = match status {
        Ok(status) => {
            info!(
                program = %program,
                exit_code = ?status.code(),
                success = status.success(),
                "process exited"
            );
            RunnerEvent::Exited {
                code: status.code(),
            }
        }
        Err(e) => {
            warn!(program = %program, error = %e, "failed to collect exit status");
            RunnerEvent::Failed(format!("waiting for '{program}': {e}"))
        }
    };

    if tx.send(event).await.is_err() {
        debug!(program = %program, "run consumer gone before exit was reported");
    }
}

async fn pump_stream<R>(mut reader: R, tx: mpsc::Sender<RunnerEvent>, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut decoder = Utf8Decoder::default();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                if !text.is_empty() && tx.send(RunnerEvent::Output(text)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx
                    .send(RunnerEvent::StreamError(format!("{stream}: {e}")))
                    .await;
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(RunnerEvent::Output(rest)).await;
    }
}
