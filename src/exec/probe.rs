// src/exec/probe.rs

//! Host tool detection (`pnpm --version`, `uv --version`, ...).

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tracing::debug;

use super::resolve::platform_launch;

/// Answers "does this tool run on the host?".
///
/// Probing is deterministic for a given host, so tests substitute a fixed
/// answer set instead of spawning anything.
pub trait ToolProbe: Send + Sync {
    fn probe<'a>(
        &'a self,
        program: &'a str,
        args: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

/// Probe that runs the tool with all stdio discarded and checks for a zero
/// exit status.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn probe<'a>(
        &'a self,
        program: &'a str,
        args: &'a [&'a str],
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            let path_var = std::env::var_os("PATH");
            let launch = match platform_launch(program, path_var.as_deref(), None) {
                Ok(launch) => launch,
                Err(e) => {
                    debug!(program, error = %e, "host tool not found");
                    return false;
                }
            };

            let status = launch
                .command(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            let available = matches!(status, Ok(s) if s.success());
            debug!(program, ?args, available, "probed host tool");
            available
        })
    }
}
