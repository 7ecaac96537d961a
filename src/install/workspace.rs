// src/install/workspace.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::config::WorkspaceConfig;
use crate::errors::{Result, RuncastError};
use crate::exec::{CommandSpec, ToolProbe};
use crate::fs::FileSystem;
use crate::registry::RunId;
use crate::types::{InstallOnly, PackageManagerChoice, PythonToolChoice};

use super::attempt::DryRunReport;
use super::fallback::{FallbackInstaller, InstallOutcome};
use super::plan::{node_install_attempt, pip_upgrade, python_requirement_attempts, venv_python_path};
use super::pm::{PackageManager, choose_package_manager, detect_python, uv_available};
use super::progress::{ProgressSink, run_step};
use super::projects::{discover_node_projects, is_node_installed, relative_label};

/// Options of one workspace install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub only: InstallOnly,
    /// Reinstall projects that already have `node_modules` and recreate the venv.
    pub force: bool,
    pub dry_run: bool,
    pub pip_index: Option<String>,
    pub package_manager: PackageManagerChoice,
    pub python_tool: PythonToolChoice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    Installed { run_id: RunId },
    /// `node_modules` already present and not forced.
    Skipped,
    DryRun(Vec<DryRunReport>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInstall {
    pub dir: PathBuf,
    pub label: String,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PythonStatus {
    NotRequested,
    /// No `requirements.txt` in the python project.
    Skipped,
    Installed {
        label: String,
        run_id: RunId,
    },
    DryRun(Vec<DryRunReport>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub package_manager: Option<PackageManager>,
    pub node: Vec<ProjectInstall>,
    pub python: PythonStatus,
}

/// Installs node and Python dependencies across a workspace.
#[derive(Clone)]
pub struct WorkspaceInstaller {
    broadcaster: Broadcaster,
    fs: Arc<dyn FileSystem>,
    probe: Arc<dyn ToolProbe>,
    sink: Arc<dyn ProgressSink>,
    installer: FallbackInstaller,
    workspace: WorkspaceConfig,
}

impl std::fmt::Debug for WorkspaceInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceInstaller")
            .field("root", &self.workspace.root)
            .finish_non_exhaustive()
    }
}

impl WorkspaceInstaller {
    pub fn new(
        broadcaster: Broadcaster,
        fs: Arc<dyn FileSystem>,
        probe: Arc<dyn ToolProbe>,
        sink: Arc<dyn ProgressSink>,
        workspace: WorkspaceConfig,
    ) -> Self {
        let installer = FallbackInstaller::new(broadcaster.clone(), Arc::clone(&sink));
        Self {
            broadcaster,
            fs,
            probe,
            sink,
            installer,
            workspace,
        }
    }

    pub async fn run(&self, opts: &InstallOptions) -> Result<InstallReport> {
        let mut report = InstallReport {
            package_manager: None,
            node: Vec::new(),
            python: PythonStatus::NotRequested,
        };

        if opts.only.includes_node() {
            let pm = choose_package_manager(opts.package_manager, self.probe.as_ref()).await?;
            info!(package_manager = %pm, "installing node dependencies");
            report.package_manager = Some(pm);
            report.node = self.install_node_projects(pm, opts).await?;
        }

        if opts.only.includes_python() {
            report.python = self.install_python(opts).await?;
        }

        self.sink.step("Setup completed successfully!");
        Ok(report)
    }

    async fn install_node_projects(
        &self,
        pm: PackageManager,
        opts: &InstallOptions,
    ) -> Result<Vec<ProjectInstall>> {
        self.sink.step("Node.js Dependencies");
        let root = &self.workspace.root;
        let projects = discover_node_projects(
            self.fs.as_ref(),
            root,
            &self.workspace.extra_projects,
            &self.workspace.project_globs,
        );

        let mut results = Vec::with_capacity(projects.len());
        for dir in projects {
            let label = relative_label(root, &dir);

            if is_node_installed(self.fs.as_ref(), &dir) && !opts.force {
                self.sink
                    .step(&format!("[Node] Skipped (already installed) @ {label}"));
                results.push(ProjectInstall {
                    dir,
                    label,
                    status: ProjectStatus::Skipped,
                });
                continue;
            }

            self.sink
                .step(&format!("Installing dependencies for {label}..."));
            let attempt = node_install_attempt(pm, &dir);
            let status = match self
                .installer
                .install(&label, &[attempt], opts.dry_run)
                .await?
            {
                InstallOutcome::Installed { run_id, .. } => {
                    self.sink
                        .step(&format!("Installed dependencies for {label}"));
                    ProjectStatus::Installed { run_id }
                }
                InstallOutcome::DryRun { reports, .. } => ProjectStatus::DryRun(reports),
            };
            results.push(ProjectInstall { dir, label, status });
        }
        Ok(results)
    }

    async fn install_python(&self, opts: &InstallOptions) -> Result<PythonStatus> {
        let root = &self.workspace.root;
        let project_dir = self.workspace.python_project_dir();
        let label = relative_label(root, &project_dir);

        if !self.fs.is_file(&project_dir.join("requirements.txt")) {
            self.sink.step(&format!(
                "[Python] {label} not found or requirements.txt missing, skipped"
            ));
            return Ok(PythonStatus::Skipped);
        }

        let venv_dir = project_dir.join(".venv");
        let need_create = opts.force || !self.fs.exists(&venv_dir);
        let has_uv = uv_available(self.probe.as_ref()).await;

        if need_create {
            if opts.dry_run {
                self.sink
                    .step(&format!("[DRY] Create Python venv @ {label}"));
            } else {
                self.sink
                    .step(&format!("Creating Python venv @ {label}"));
                let spec = self.venv_command(opts.python_tool, has_uv).await?;
                run_step(
                    &self.broadcaster,
                    spec.current_dir(&project_dir),
                    self.sink.as_ref(),
                )
                .await?
                .check()?;
            }
        }

        let venv_python = venv_python_path(&venv_dir);
        let attempts = python_requirement_attempts(
            &project_dir,
            &venv_python,
            opts.pip_index.as_deref(),
            has_uv,
        );

        if opts.dry_run {
            self.sink.step("[DRY] Upgrade pip & install requirements");
            return match self.installer.install(&label, &attempts, true).await? {
                InstallOutcome::DryRun { reports, .. } => Ok(PythonStatus::DryRun(reports)),
                InstallOutcome::Installed { .. } => Ok(PythonStatus::DryRun(Vec::new())),
            };
        }

        // A failed pip upgrade does not stop the install.
        match run_step(
            &self.broadcaster,
            pip_upgrade(&project_dir, &venv_python),
            self.sink.as_ref(),
        )
        .await
        {
            Ok(step) if step.succeeded() => {}
            Ok(step) => warn!(state = %step.state, "pip upgrade failed; continuing"),
            Err(err) => warn!(error = %err, "pip upgrade failed; continuing"),
        }

        self.sink
            .step(&format!("Installing requirements for {label}..."));
        match self.installer.install(&label, &attempts, false).await? {
            InstallOutcome::Installed { label, run_id, .. } => {
                Ok(PythonStatus::Installed { label, run_id })
            }
            InstallOutcome::DryRun { reports, .. } => Ok(PythonStatus::DryRun(reports)),
        }
    }

    /// `uv venv .venv` when allowed and available, otherwise
    /// `<python> -m venv .venv` with the first working interpreter.
    async fn venv_command(&self, tool: PythonToolChoice, has_uv: bool) -> Result<CommandSpec> {
        if matches!(tool, PythonToolChoice::Uv | PythonToolChoice::Auto) && has_uv {
            return Ok(CommandSpec::new("uv").args(["venv", ".venv"]));
        }

        let python = detect_python(self.probe.as_ref()).await.ok_or_else(|| {
            RuncastError::Other(anyhow!(
                "No Python found. Please install Python 3 or install uv."
            ))
        })?;

        Ok(CommandSpec::new(python.program)
            .args(python.args)
            .args(["-m", "venv", ".venv"]))
    }
}
