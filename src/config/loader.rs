// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable used when `[install].pip_index` is not set.
pub const PIP_INDEX_ENV: &str = "PIP_INDEX_URL";
/// Environment variable overriding `[server].cors_origin`.
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML (or starts from defaults when `path` is the default path and
///   no such file exists).
/// - Applies environment fallbacks (`PIP_INDEX_URL`, `CORS_ORIGIN`).
/// - Resolves a relative `[workspace].root` against the config file's
///   directory, then makes it absolute.
/// - Checks durations, limits, globs and the bind address.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();

    let mut raw = if !path.exists() && path == default_config_path() {
        debug!(path = ?path, "no config file; using defaults");
        RawConfigFile::default()
    } else {
        load_from_path(path)?
    };

    apply_env_overrides(&mut raw, |key| std::env::var(key).ok());

    if raw.workspace.root.is_relative() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            raw.workspace.root = parent.join(&raw.workspace.root);
        }
    }
    raw.workspace.root = std::path::absolute(&raw.workspace.root)?;

    ConfigFile::try_from(raw)
}

/// Fill unset values from the environment.
pub fn apply_env_overrides(raw: &mut RawConfigFile, env: impl Fn(&str) -> Option<String>) {
    let pip_index_unset = raw
        .install
        .pip_index
        .as_deref()
        .is_none_or(|s| s.trim().is_empty());
    if pip_index_unset {
        if let Some(index) = env(PIP_INDEX_ENV).filter(|s| !s.trim().is_empty()) {
            raw.install.pip_index = Some(index);
        }
    }

    if let Some(origin) = env(CORS_ORIGIN_ENV).filter(|s| !s.trim().is_empty()) {
        raw.server.cors_origin = origin;
    }
}

/// `Runcast.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Runcast.toml")
}
