// src/config/model.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use globset::GlobSet;
use serde::Deserialize;

use crate::registry::RegistryLimits;
use crate::types::{PackageManagerChoice, PythonToolChoice};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:7245"
/// cors_origin = "*"
///
/// [registry]
/// log_capacity = 5000
/// max_runs = 64
/// retention = "30m"
/// sweep_interval = "30s"
///
/// [workspace]
/// root = "."
/// extra_projects = ["sentra-config-ui"]
/// project_globs = ["sentra-*"]
/// python_project = "sentra-emo"
///
/// [install]
/// pip_index = "https://mirrors.example.com/pypi/simple"
/// package_manager = "auto"
/// python_tool = "auto"
///
/// [update]
/// default_branch = "main"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: RawServerSection,
    #[serde(default)]
    pub registry: RawRegistrySection,
    #[serde(default)]
    pub workspace: RawWorkspaceSection,
    #[serde(default)]
    pub install: InstallSection,
    #[serde(default)]
    pub update: UpdateSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// `"*"` or a comma separated list of origins.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_bind() -> String {
    "0.0.0.0:7245".to_string()
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for RawServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origin: default_cors_origin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRegistrySection {
    /// Framed lines kept per run.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_max_runs")]
    pub max_runs: usize,
    /// Duration string such as `"30m"`.
    #[serde(default = "default_retention")]
    pub retention: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

fn default_log_capacity() -> usize {
    5000
}

fn default_max_runs() -> usize {
    64
}

fn default_retention() -> String {
    "30m".to_string()
}

fn default_sweep_interval() -> String {
    "30s".to_string()
}

impl Default for RawRegistrySection {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            max_runs: default_max_runs(),
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkspaceSection {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Directories (relative to `root`) always treated as node projects
    /// when they hold a `package.json`.
    #[serde(default)]
    pub extra_projects: Vec<PathBuf>,
    /// Globs matched against first-level directory names.
    #[serde(default = "default_project_globs")]
    pub project_globs: Vec<String>,
    /// Directory (relative to `root`) holding `requirements.txt`.
    #[serde(default = "default_python_project")]
    pub python_project: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_project_globs() -> Vec<String> {
    vec!["sentra-*".to_string()]
}

fn default_python_project() -> PathBuf {
    PathBuf::from("sentra-emo")
}

impl Default for RawWorkspaceSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            extra_projects: Vec::new(),
            project_globs: default_project_globs(),
            python_project: default_python_project(),
        }
    }
}

/// `[install]` section. Needs no validation beyond deserialisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallSection {
    /// Alternate Python package index tried first.
    #[serde(default)]
    pub pip_index: Option<String>,
    #[serde(default)]
    pub package_manager: PackageManagerChoice,
    #[serde(default)]
    pub python_tool: PythonToolChoice,
}

/// `[update]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSection {
    /// Branch assumed when neither git nor `.git/HEAD` names one.
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for UpdateSection {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

/// Validated configuration. Only built through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub workspace: WorkspaceConfig,
    pub install: InstallSection,
    pub update: UpdateSection,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub cors_origin: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub limits: RegistryLimits,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub extra_projects: Vec<PathBuf>,
    pub project_patterns: Vec<String>,
    pub project_globs: GlobSet,
    pub python_project: PathBuf,
}

impl WorkspaceConfig {
    pub fn python_project_dir(&self) -> PathBuf {
        self.root.join(&self.python_project)
    }
}
