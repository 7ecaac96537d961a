// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the source checkout is synchronised with its remote.
///
/// - `Safe`: fetch, then fast-forward, falling back to rebase with autostash.
/// - `Force`: fetch, hard-reset onto the remote tracking branch, then clean
///   untracked and ignored files. Local changes are discarded and cannot be
///   recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Safe,
    Force,
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Ok(UpdateMode::Safe),
            "force" | "forced" => Ok(UpdateMode::Force),
            other => Err(format!(
                "invalid update mode: {other} (expected \"safe\" or \"force\")"
            )),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateMode::Safe => "safe",
            UpdateMode::Force => "force",
        })
    }
}

/// Which checkouts an update touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateScope {
    /// Only the workspace root.
    Root,
    /// The root plus every discovered project that is its own checkout.
    #[default]
    All,
}

impl FromStr for UpdateScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "root" => Ok(UpdateScope::Root),
            "all" => Ok(UpdateScope::All),
            other => Err(format!(
                "invalid update scope: {other} (expected \"root\" or \"all\")"
            )),
        }
    }
}

impl fmt::Display for UpdateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpdateScope::Root => "root",
            UpdateScope::All => "all",
        })
    }
}

/// Which dependency sets are installed (`install --only`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOnly {
    #[default]
    All,
    Node,
    Python,
}

impl InstallOnly {
    pub fn includes_node(self) -> bool {
        matches!(self, InstallOnly::All | InstallOnly::Node)
    }

    pub fn includes_python(self) -> bool {
        matches!(self, InstallOnly::All | InstallOnly::Python)
    }
}

impl FromStr for InstallOnly {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(InstallOnly::All),
            "node" => Ok(InstallOnly::Node),
            "python" => Ok(InstallOnly::Python),
            other => Err(format!(
                "invalid install target: {other} (expected \"all\", \"node\" or \"python\")"
            )),
        }
    }
}

impl fmt::Display for InstallOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallOnly::All => "all",
            InstallOnly::Node => "node",
            InstallOnly::Python => "python",
        })
    }
}

/// Re-install step run after a successful update.
///
/// `node` is the dependencies-only re-install; `dependencies-only` is accepted
/// as an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallAfter {
    None,
    #[default]
    #[serde(alias = "dependencies-only", alias = "dependenciesOnly")]
    Node,
    Python,
    All,
}

impl InstallAfter {
    /// The bootstrap selection this re-install maps onto, if any.
    pub fn as_install_only(self) -> Option<InstallOnly> {
        match self {
            InstallAfter::None => None,
            InstallAfter::Node => Some(InstallOnly::Node),
            InstallAfter::Python => Some(InstallOnly::Python),
            InstallAfter::All => Some(InstallOnly::All),
        }
    }
}

impl FromStr for InstallAfter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(InstallAfter::None),
            "node" | "dependencies-only" | "dependenciesonly" => Ok(InstallAfter::Node),
            "python" => Ok(InstallAfter::Python),
            "all" => Ok(InstallAfter::All),
            other => Err(format!(
                "invalid install step: {other} (expected \"none\", \"node\", \"python\" or \"all\")"
            )),
        }
    }
}

impl fmt::Display for InstallAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallAfter::None => "none",
            InstallAfter::Node => "node",
            InstallAfter::Python => "python",
            InstallAfter::All => "all",
        })
    }
}

/// Package manager requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerChoice {
    #[default]
    Auto,
    Pnpm,
    Npm,
    Cnpm,
}

impl FromStr for PackageManagerChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(PackageManagerChoice::Auto),
            "pnpm" => Ok(PackageManagerChoice::Pnpm),
            "npm" => Ok(PackageManagerChoice::Npm),
            "cnpm" => Ok(PackageManagerChoice::Cnpm),
            other => Err(format!(
                "invalid package manager: {other} (expected auto, pnpm, npm or cnpm)"
            )),
        }
    }
}

impl fmt::Display for PackageManagerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageManagerChoice::Auto => "auto",
            PackageManagerChoice::Pnpm => "pnpm",
            PackageManagerChoice::Npm => "npm",
            PackageManagerChoice::Cnpm => "cnpm",
        })
    }
}

/// Tool used to create the Python virtual environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PythonToolChoice {
    #[default]
    Auto,
    Uv,
    Venv,
}

impl FromStr for PythonToolChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(PythonToolChoice::Auto),
            "uv" => Ok(PythonToolChoice::Uv),
            "venv" => Ok(PythonToolChoice::Venv),
            other => Err(format!(
                "invalid python tool: {other} (expected auto, uv or venv)"
            )),
        }
    }
}

impl fmt::Display for PythonToolChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PythonToolChoice::Auto => "auto",
            PythonToolChoice::Uv => "uv",
            PythonToolChoice::Venv => "venv",
        })
    }
}
