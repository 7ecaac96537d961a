// src/update/orchestrator.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::config::ConfigFile;
use crate::errors::{Result, RuncastError};
use crate::exec::{CommandSpec, ToolProbe};
use crate::fs::FileSystem;
use crate::install::{
    InstallOptions, InstallReport, PackageManager, ProgressSink, WorkspaceInstaller,
    choose_package_manager, run_step,
};
use crate::install::projects::{discover_git_checkouts, is_git_checkout, relative_label};
use crate::registry::RunId;
use crate::types::{InstallAfter, PackageManagerChoice, UpdateMode, UpdateScope};

use super::branch::{GitHeadQuery, HeadQuery, ResolvedBranch, resolve_branch};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub mode: UpdateMode,
    pub scope: UpdateScope,
    pub install_after: InstallAfter,
    /// `None` falls back to `[install].package_manager`.
    pub package_manager: Option<PackageManagerChoice>,
}

/// One git step that ran successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStep {
    pub name: &'static str,
    pub run_id: RunId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUpdate {
    pub dir: PathBuf,
    pub label: String,
    /// Set in forced mode.
    pub branch: Option<ResolvedBranch>,
    pub steps: Vec<UpdateStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinstallOutcome {
    NotRequested,
    Completed(InstallReport),
    /// The checkouts were updated but the re-install failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub mode: UpdateMode,
    pub checkouts: Vec<CheckoutUpdate>,
    pub reinstall: ReinstallOutcome,
}

impl UpdateReport {
    /// Source updated, dependency re-install failed.
    pub fn is_partial(&self) -> bool {
        matches!(self.reinstall, ReinstallOutcome::Failed(_))
    }
}

const STEP_FETCH: &str = "fetch";
const STEP_FAST_FORWARD: &str = "pull --ff-only";
const STEP_REBASE: &str = "pull --rebase --autostash";
const STEP_RESET: &str = "reset --hard";
const STEP_CLEAN: &str = "clean";

/// Drives source synchronisation of the workspace checkouts, then the
/// optional dependency re-install.
///
/// Any failing git step aborts the remaining steps with
/// [`RuncastError::UpdateAborted`]. Nothing is rolled back: the checkout is
/// left as the last successful step produced it. Forced mode discards local
/// changes and untracked files irreversibly.
pub struct UpdateOrchestrator {
    broadcaster: Broadcaster,
    fs: Arc<dyn FileSystem>,
    probe: Arc<dyn ToolProbe>,
    head_query: Arc<dyn HeadQuery>,
    sink: Arc<dyn ProgressSink>,
    installer: WorkspaceInstaller,
    config: ConfigFile,
}

impl std::fmt::Debug for UpdateOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateOrchestrator")
            .field("root", &self.config.workspace.root)
            .finish_non_exhaustive()
    }
}

impl UpdateOrchestrator {
    pub fn new(
        broadcaster: Broadcaster,
        fs: Arc<dyn FileSystem>,
        probe: Arc<dyn ToolProbe>,
        sink: Arc<dyn ProgressSink>,
        config: ConfigFile,
    ) -> Self {
        let installer = WorkspaceInstaller::new(
            broadcaster.clone(),
            Arc::clone(&fs),
            Arc::clone(&probe),
            Arc::clone(&sink),
            config.workspace.clone(),
        );
        Self {
            broadcaster,
            fs,
            probe,
            head_query: Arc::new(GitHeadQuery),
            sink,
            installer,
            config,
        }
    }

    pub fn with_head_query(mut self, head_query: Arc<dyn HeadQuery>) -> Self {
        self.head_query = head_query;
        self
    }

    pub async fn run(&self, opts: &UpdateOptions) -> Result<UpdateReport> {
        let root = self.config.workspace.root.clone();

        // Resolved before touching git so a missing tool fails early.
        let package_manager = match opts.install_after.as_install_only() {
            Some(only) if only.includes_node() => {
                let choice = opts
                    .package_manager
                    .unwrap_or(self.config.install.package_manager);
                Some(choose_package_manager(choice, self.probe.as_ref()).await?)
            }
            _ => None,
        };

        if !is_git_checkout(self.fs.as_ref(), &root) {
            return Err(RuncastError::NoGitRepository(root));
        }

        let mut dirs = vec![root.clone()];
        if opts.scope == UpdateScope::All {
            dirs.extend(discover_git_checkouts(
                self.fs.as_ref(),
                &root,
                &self.config.workspace.project_globs,
            ));
        }

        let mut checkouts = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let label = relative_label(&root, &dir);
            checkouts.push(self.update_checkout(&dir, label, opts.mode).await?);
        }

        let reinstall = self.reinstall(opts.install_after, package_manager).await;
        if let ReinstallOutcome::Failed(reason) = &reinstall {
            self.sink
                .step(&format!("Update complete, but re-install failed: {reason}"));
        } else {
            self.sink.step("Update complete.");
        }

        Ok(UpdateReport {
            mode: opts.mode,
            checkouts,
            reinstall,
        })
    }

    async fn update_checkout(
        &self,
        dir: &Path,
        label: String,
        mode: UpdateMode,
    ) -> Result<CheckoutUpdate> {
        let mut update = CheckoutUpdate {
            dir: dir.to_path_buf(),
            label,
            branch: None,
            steps: Vec::new(),
        };

        match mode {
            UpdateMode::Safe => {
                self.sink
                    .step(&format!("Safe updating repository @ {}...", update.label));
                self.git(dir, STEP_FETCH, &["fetch", "--all", "--prune"], &mut update)
                    .await?;

                if let Err(err) = self
                    .git(dir, STEP_FAST_FORWARD, &["pull", "--ff-only"], &mut update)
                    .await
                {
                    warn!(dir = ?dir, error = %err, "fast-forward failed; retrying with rebase");
                    self.sink
                        .step("Fast-forward not possible; retrying with rebase --autostash");
                    self.git(
                        dir,
                        STEP_REBASE,
                        &["pull", "--rebase", "--autostash"],
                        &mut update,
                    )
                    .await?;
                }
            }
            UpdateMode::Force => {
                let branch = resolve_branch(
                    self.head_query.as_ref(),
                    self.fs.as_ref(),
                    dir,
                    &self.config.update.default_branch,
                )
                .await;
                self.sink.step(&format!(
                    "Force updating repository @ {} onto origin/{} (branch from {})...",
                    update.label, branch.name, branch.source
                ));
                let target = format!("origin/{}", branch.name);
                update.branch = Some(branch);

                self.git(dir, STEP_FETCH, &["fetch", "--all", "--prune"], &mut update)
                    .await?;
                self.git(dir, STEP_RESET, &["reset", "--hard", target.as_str()], &mut update)
                    .await?;
                self.git(dir, STEP_CLEAN, &["clean", "-fdx"], &mut update)
                    .await?;
            }
        }

        info!(dir = ?dir, mode = %mode, steps = update.steps.len(), "checkout updated");
        Ok(update)
    }

    /// Run one git step; a failure becomes `UpdateAborted` naming the step.
    async fn git(
        &self,
        dir: &Path,
        name: &'static str,
        args: &[&str],
        update: &mut CheckoutUpdate,
    ) -> Result<()> {
        let spec = CommandSpec::new("git").args(args.iter().copied()).current_dir(dir);
        info!(dir = ?dir, step = name, "update step started");

        let run_id = run_step(&self.broadcaster, spec, self.sink.as_ref())
            .await
            .and_then(|step| step.check().map(|()| step.run_id))
            .map_err(|err| {
                warn!(dir = ?dir, step = name, error = %err, "update step failed");
                RuncastError::UpdateAborted {
                    step: name.to_string(),
                    reason: err.to_string(),
                }
            })?;

        update.steps.push(UpdateStep { name, run_id });
        Ok(())
    }

    async fn reinstall(
        &self,
        install_after: InstallAfter,
        package_manager: Option<PackageManager>,
    ) -> ReinstallOutcome {
        let Some(only) = install_after.as_install_only() else {
            return ReinstallOutcome::NotRequested;
        };

        let opts = InstallOptions {
            only,
            force: true,
            dry_run: false,
            pip_index: self.config.install.pip_index.clone(),
            package_manager: package_manager
                .map(PackageManager::as_choice)
                .unwrap_or(self.config.install.package_manager),
            python_tool: self.config.install.python_tool,
        };

        match self.installer.run(&opts).await {
            Ok(report) => ReinstallOutcome::Completed(report),
            Err(err) => {
                warn!(error = %err, "dependency re-install after update failed");
                ReinstallOutcome::Failed(err.to_string())
            }
        }
    }
}
