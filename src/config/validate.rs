// src/config/validate.rs

use std::net::SocketAddr;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{
    ConfigFile, RawConfigFile, RawRegistrySection, RawServerSection, RawWorkspaceSection,
    RegistryConfig, ServerConfig, WorkspaceConfig,
};
use crate::errors::{Result, RuncastError};
use crate::registry::RegistryLimits;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RuncastError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let server = validate_server(&raw.server)?;
        let registry = validate_registry(&raw.registry)?;
        let workspace = validate_workspace(raw.workspace)?;
        validate_update_branch(&raw.update.default_branch)?;

        let mut install = raw.install;
        install.pip_index = install
            .pip_index
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ConfigFile {
            server,
            registry,
            workspace,
            install,
            update: raw.update,
        })
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        // Defaults always validate; fall back to hard-coded values regardless.
        ConfigFile::try_from(RawConfigFile::default()).unwrap_or_else(|_| ConfigFile {
            server: ServerConfig {
                bind: SocketAddr::from(([0, 0, 0, 0], 7245)),
                cors_origin: "*".to_string(),
            },
            registry: RegistryConfig {
                limits: RegistryLimits::default(),
                sweep_interval: Duration::from_secs(30),
            },
            workspace: WorkspaceConfig {
                root: ".".into(),
                extra_projects: Vec::new(),
                project_patterns: Vec::new(),
                project_globs: GlobSet::empty(),
                python_project: "sentra-emo".into(),
            },
            install: Default::default(),
            update: Default::default(),
        })
    }
}

fn validate_server(raw: &RawServerSection) -> Result<ServerConfig> {
    let bind: SocketAddr = raw.bind.trim().parse().map_err(|e| {
        RuncastError::ConfigError(format!(
            "[server].bind must be a socket address like 0.0.0.0:7245 (got '{}'): {e}",
            raw.bind
        ))
    })?;

    let cors_origin = raw.cors_origin.trim();
    if cors_origin.is_empty() {
        return Err(RuncastError::ConfigError(
            "[server].cors_origin must not be empty (use \"*\" to allow any origin)".to_string(),
        ));
    }

    Ok(ServerConfig {
        bind,
        cors_origin: cors_origin.to_string(),
    })
}

fn validate_registry(raw: &RawRegistrySection) -> Result<RegistryConfig> {
    if raw.log_capacity == 0 {
        return Err(RuncastError::ConfigError(
            "[registry].log_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.max_runs == 0 {
        return Err(RuncastError::ConfigError(
            "[registry].max_runs must be >= 1 (got 0)".to_string(),
        ));
    }

    let retention = parse_duration(&raw.retention)
        .map_err(|e| RuncastError::ConfigError(format!("[registry].retention: {e}")))?;
    let sweep_interval = parse_duration(&raw.sweep_interval)
        .map_err(|e| RuncastError::ConfigError(format!("[registry].sweep_interval: {e}")))?;
    if sweep_interval.is_zero() {
        return Err(RuncastError::ConfigError(
            "[registry].sweep_interval must be greater than zero".to_string(),
        ));
    }

    Ok(RegistryConfig {
        limits: RegistryLimits {
            log_capacity: raw.log_capacity,
            max_runs: raw.max_runs,
            retention,
            ..RegistryLimits::default()
        },
        sweep_interval,
    })
}

fn validate_workspace(raw: RawWorkspaceSection) -> Result<WorkspaceConfig> {
    let project_globs = compile_globs(&raw.project_globs)?;
    Ok(WorkspaceConfig {
        root: raw.root,
        extra_projects: raw.extra_projects,
        project_patterns: raw.project_globs,
        project_globs,
        python_project: raw.python_project,
    })
}

fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            RuncastError::ConfigError(format!(
                "[workspace].project_globs: invalid glob '{pattern}': {e}"
            ))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| RuncastError::ConfigError(format!("[workspace].project_globs: {e}")))
}

fn validate_update_branch(branch: &str) -> Result<()> {
    let branch = branch.trim();
    if branch.is_empty() || branch.contains(char::is_whitespace) {
        return Err(RuncastError::ConfigError(format!(
            "[update].default_branch must be a branch name (got '{branch}')"
        )));
    }
    Ok(())
}

/// Parse durations like `"500ms"`, `"30s"`, `"30m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
