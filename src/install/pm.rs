// src/install/pm.rs

//! Host tool selection: node package manager, Python interpreter and `uv`.

use std::fmt;

use tracing::debug;

use crate::errors::{Result, RuncastError};
use crate::exec::ToolProbe;
use crate::types::PackageManagerChoice;

const VERSION_ARGS: &[&str] = &["--version"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Npm,
    Cnpm,
}

impl PackageManager {
    /// Probe order used for `auto`.
    pub const ALL: [PackageManager; 3] =
        [PackageManager::Pnpm, PackageManager::Npm, PackageManager::Cnpm];

    pub fn program(self) -> &'static str {
        match self {
            PackageManager::Pnpm => "pnpm",
            PackageManager::Npm => "npm",
            PackageManager::Cnpm => "cnpm",
        }
    }

    /// Arguments for an install that includes dev dependencies.
    pub fn install_args(self) -> [&'static str; 2] {
        match self {
            PackageManager::Pnpm => ["install", "--prod=false"],
            PackageManager::Npm | PackageManager::Cnpm => ["install", "--production=false"],
        }
    }

    pub fn as_choice(self) -> PackageManagerChoice {
        match self {
            PackageManager::Pnpm => PackageManagerChoice::Pnpm,
            PackageManager::Npm => PackageManagerChoice::Npm,
            PackageManager::Cnpm => PackageManagerChoice::Cnpm,
        }
    }

    fn from_choice(choice: PackageManagerChoice) -> Option<Self> {
        match choice {
            PackageManagerChoice::Auto => None,
            PackageManagerChoice::Pnpm => Some(PackageManager::Pnpm),
            PackageManagerChoice::Npm => Some(PackageManager::Npm),
            PackageManagerChoice::Cnpm => Some(PackageManager::Cnpm),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Resolve the package manager to use.
///
/// An explicit choice must be runnable; `auto` takes the first of pnpm, npm
/// and cnpm that is.
pub async fn choose_package_manager(
    choice: PackageManagerChoice,
    probe: &dyn ToolProbe,
) -> Result<PackageManager> {
    if let Some(pm) = PackageManager::from_choice(choice) {
        if probe.probe(pm.program(), VERSION_ARGS).await {
            return Ok(pm);
        }
        return Err(RuncastError::NoPackageManager(format!(
            "package manager {pm} not found in PATH"
        )));
    }

    for pm in PackageManager::ALL {
        if probe.probe(pm.program(), VERSION_ARGS).await {
            debug!(package_manager = %pm, "selected package manager");
            return Ok(pm);
        }
    }

    Err(RuncastError::NoPackageManager(
        "install pnpm, npm or cnpm, or pass --pm".to_string(),
    ))
}

/// A Python interpreter invocation, e.g. `py -3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonLauncher {
    pub program: String,
    pub args: Vec<String>,
}

/// First interpreter that answers `-V`: python3, python, `py -3`, py.
pub async fn detect_python(probe: &dyn ToolProbe) -> Option<PythonLauncher> {
    const CANDIDATES: [(&str, &[&str]); 4] = [
        ("python3", &[]),
        ("python", &[]),
        ("py", &["-3"]),
        ("py", &[]),
    ];

    for (program, prefix) in CANDIDATES {
        let mut args: Vec<&str> = prefix.to_vec();
        args.push("-V");
        if probe.probe(program, &args).await {
            return Some(PythonLauncher {
                program: program.to_string(),
                args: prefix.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    None
}

pub async fn uv_available(probe: &dyn ToolProbe) -> bool {
    probe.probe("uv", VERSION_ARGS).await
}
