// src/server/scripts.rs

//! Request bodies of the control endpoints and the command lines they map to.
//!
//! Each control request becomes a single run of this binary's own `install`
//! or `update` subcommand, so the whole orchestration streams through one
//! run id.

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::CommandSpec;
use crate::logging::LOG_ENV;
use crate::types::{InstallAfter, InstallOnly, PackageManagerChoice, UpdateMode, UpdateScope};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    #[serde(default)]
    pub only: Option<InstallOnly>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub pip_index: Option<String>,
    #[serde(default)]
    pub pm: Option<PackageManagerChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub mode: Option<UpdateMode>,
    #[serde(default)]
    pub scope: Option<UpdateScope>,
    #[serde(default)]
    pub install: Option<InstallAfter>,
    #[serde(default)]
    pub pm: Option<PackageManagerChoice>,
}

/// How to invoke this binary for script runs.
#[derive(Debug, Clone)]
pub struct ScriptCommand {
    pub program: String,
    pub config: Option<PathBuf>,
    pub workdir: PathBuf,
}

impl ScriptCommand {
    /// The running executable, falling back to `runcast` on `PATH`.
    pub fn current_exe(config: Option<PathBuf>, workdir: PathBuf) -> Self {
        let program = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "runcast".to_string());
        Self {
            program,
            config,
            workdir,
        }
    }

    fn base(&self) -> CommandSpec {
        let mut spec = CommandSpec::new(self.program.clone())
            .current_dir(&self.workdir)
            .env(LOG_ENV, "warn");
        if let Some(config) = &self.config {
            spec = spec.arg("--config").arg(config.to_string_lossy());
        }
        spec
    }

    pub fn install(&self, req: &InstallRequest) -> CommandSpec {
        let mut spec = self
            .base()
            .arg("install")
            .args(["--only".to_string(), req.only.unwrap_or_default().to_string()]);
        // Without an explicit choice the child falls back to its config.
        if let Some(pm) = req.pm {
            spec = spec.arg("--pm").arg(pm.to_string());
        }
        if req.force {
            spec = spec.arg("--force");
        }
        if req.dry_run {
            spec = spec.arg("--dry-run");
        }
        if let Some(index) = req.pip_index.as_deref().filter(|s| !s.trim().is_empty()) {
            spec = spec.arg("--pip-index").arg(index.trim());
        }
        spec
    }

    pub fn update(&self, req: &UpdateRequest) -> CommandSpec {
        let spec = self
            .base()
            .arg("update")
            .args(["--mode".to_string(), req.mode.unwrap_or_default().to_string()])
            .args(["--scope".to_string(), req.scope.unwrap_or_default().to_string()])
            .args([
                "--install".to_string(),
                req.install.unwrap_or_default().to_string(),
            ]);
        match req.pm {
            Some(pm) => spec.arg("--pm").arg(pm.to_string()),
            None => spec,
        }
    }
}
