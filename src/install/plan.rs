// src/install/plan.rs

//! Attempt lists for the installs the workspace bootstrap performs.

use std::path::{Path, PathBuf};

use crate::exec::CommandSpec;

use super::attempt::InstallAttempt;
use super::pm::PackageManager;

pub const PYPI_SIMPLE: &str = "https://pypi.org/simple";

const REQUIREMENTS: &str = "requirements.txt";

/// Interpreter inside a virtual environment.
pub fn venv_python_path(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}

/// The interpreter as launched. Children resolve a relative program against
/// their own working directory, so it must not depend on ours.
fn launchable(venv_python: &Path) -> PathBuf {
    std::path::absolute(venv_python).unwrap_or_else(|_| venv_python.to_path_buf())
}

/// Ordered requirement-install attempts.
///
/// 1. alternate index with pypi.org as extra index, when configured
/// 2. pypi.org
/// 3. `uv pip` against the venv interpreter, when uv exists
pub fn python_requirement_attempts(
    project_dir: &Path,
    venv_python: &Path,
    alternate_index: Option<&str>,
    uv_available: bool,
) -> Vec<InstallAttempt> {
    let python = launchable(venv_python).to_string_lossy().into_owned();
    let pip = || {
        CommandSpec::new(python.clone())
            .args(["-m", "pip", "install", "-r", REQUIREMENTS])
            .args(["--retries", "3", "--timeout", "60"])
            .current_dir(project_dir)
    };

    let alternate_index = alternate_index.filter(|s| !s.trim().is_empty());
    let mut attempts = Vec::new();

    if let Some(index) = alternate_index {
        attempts.push(InstallAttempt::new(
            format!("pip (-i {index} + extra-index pypi.org)"),
            pip().args(["-i", index, "--extra-index-url", PYPI_SIMPLE]),
        ));
    }

    attempts.push(InstallAttempt::new(
        "pip (official pypi.org)",
        pip().args(["-i", PYPI_SIMPLE]),
    ));

    if uv_available {
        attempts.push(InstallAttempt::new(
            "uv pip (--python venv)",
            CommandSpec::new("uv")
                .args(["pip", "install", "-r", REQUIREMENTS, "--python"])
                .arg(python.clone())
                .args(["--index-url", alternate_index.unwrap_or(PYPI_SIMPLE)])
                .current_dir(project_dir),
        ));
    }

    attempts
}

/// Best-effort pip upgrade run before the requirements install.
pub fn pip_upgrade(project_dir: &Path, venv_python: &Path) -> CommandSpec {
    CommandSpec::new(launchable(venv_python).to_string_lossy())
        .args(["-m", "pip", "install", "--upgrade", "pip", "-i", PYPI_SIMPLE])
        .current_dir(project_dir)
}

/// Single attempt installing a node project including dev dependencies.
pub fn node_install_attempt(pm: PackageManager, project_dir: &Path) -> InstallAttempt {
    InstallAttempt::new(
        format!("{pm} install (include dev)"),
        CommandSpec::new(pm.program())
            .args(pm.install_args())
            .current_dir(project_dir)
            .env("npm_config_production", "false"),
    )
}
