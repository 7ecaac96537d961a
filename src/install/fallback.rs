// src/install/fallback.rs

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::errors::{AttemptFailure, Result, RuncastError};
use crate::registry::RunId;

use super::attempt::{DryRunReport, InstallAttempt};
use super::progress::{ProgressSink, run_step};

/// Result of a logical install that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// An attempt exited with code 0. Earlier failures are kept for the log.
    Installed {
        target: String,
        label: String,
        run_id: RunId,
        failures: Vec<AttemptFailure>,
    },
    /// Dry run: one report per attempt, nothing launched.
    DryRun {
        target: String,
        reports: Vec<DryRunReport>,
    },
}

impl InstallOutcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            InstallOutcome::Installed { label, .. } => Some(label),
            InstallOutcome::DryRun { .. } => None,
        }
    }

    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            InstallOutcome::Installed { run_id, .. } => Some(run_id),
            InstallOutcome::DryRun { .. } => None,
        }
    }
}

/// Runs an ordered list of install attempts until the first one succeeds.
///
/// Each attempt is one registry run. A failing attempt (non-zero exit,
/// signal, launch error) is logged and the next one is tried; only when the
/// list is exhausted does the install fail, with every attempt's error in
/// [`RuncastError::AggregateInstallFailure`].
///
/// Installs for the same target are serialised; different targets may run
/// concurrently.
#[derive(Clone)]
pub struct FallbackInstaller {
    broadcaster: Broadcaster,
    sink: Arc<dyn ProgressSink>,
    targets: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl std::fmt::Debug for FallbackInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackInstaller").finish_non_exhaustive()
    }
}

impl FallbackInstaller {
    pub fn new(broadcaster: Broadcaster, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            broadcaster,
            sink,
            targets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn install(
        &self,
        target: &str,
        attempts: &[InstallAttempt],
        dry_run: bool,
    ) -> Result<InstallOutcome> {
        let total = attempts.len();

        if dry_run {
            let reports: Vec<DryRunReport> = attempts
                .iter()
                .enumerate()
                .map(|(i, attempt)| DryRunReport {
                    position: i + 1,
                    total,
                    label: attempt.label.clone(),
                    command: attempt.spec.display_line(),
                })
                .collect();
            for report in &reports {
                self.sink.step(&report.to_string());
            }
            debug!(target, attempts = total, "dry-run install");
            return Ok(InstallOutcome::DryRun {
                target: target.to_string(),
                reports,
            });
        }

        let lock = self.target_lock(target);
        let _guard = lock.lock().await;

        let mut failures = Vec::new();
        for (i, attempt) in attempts.iter().enumerate() {
            let position = i + 1;
            self.sink
                .step(&format!("Attempt {position}/{total}: {}", attempt.label));
            info!(target, attempt = %attempt.label, position, total, "install attempt started");

            let outcome = run_step(&self.broadcaster, attempt.spec.clone(), self.sink.as_ref())
                .await
                .and_then(|step| step.check().map(|()| step.run_id));

            match outcome {
                Ok(run_id) => {
                    self.sink.step(&format!("Success: {}", attempt.label));
                    info!(target, attempt = %attempt.label, run_id = %run_id, "install attempt succeeded");
                    return Ok(InstallOutcome::Installed {
                        target: target.to_string(),
                        label: attempt.label.clone(),
                        run_id,
                        failures,
                    });
                }
                Err(err) => {
                    self.sink.step(&format!("Failed: {}", attempt.label));
                    warn!(target, attempt = %attempt.label, error = %err, "install attempt failed");
                    failures.push(AttemptFailure {
                        label: attempt.label.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        Err(RuncastError::AggregateInstallFailure {
            target: target.to_string(),
            failures,
        })
    }

    fn target_lock(&self, target: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut targets = self.targets.lock();
        Arc::clone(
            targets
                .entry(target.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}
