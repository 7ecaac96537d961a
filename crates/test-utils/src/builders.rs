#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use runcast::broadcast::Broadcaster;
use runcast::config::ConfigFile;
use runcast::config::model::RawConfigFile;
use runcast::exec::CommandRunner;
use runcast::registry::{ProcessRegistry, RegistryLimits};
use runcast::types::PackageManagerChoice;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.workspace.root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_project_glob(mut self, pattern: &str) -> Self {
        self.config.workspace.project_globs.push(pattern.to_string());
        self
    }

    pub fn with_only_project_globs(mut self, patterns: &[&str]) -> Self {
        self.config.workspace.project_globs = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_extra_project(mut self, dir: &str) -> Self {
        self.config.workspace.extra_projects.push(PathBuf::from(dir));
        self
    }

    pub fn with_python_project(mut self, dir: &str) -> Self {
        self.config.workspace.python_project = PathBuf::from(dir);
        self
    }

    pub fn with_pip_index(mut self, index: &str) -> Self {
        self.config.install.pip_index = Some(index.to_string());
        self
    }

    pub fn with_package_manager(mut self, choice: PackageManagerChoice) -> Self {
        self.config.install.package_manager = choice;
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.config.registry.log_capacity = capacity;
        self
    }

    pub fn with_max_runs(mut self, max_runs: usize) -> Self {
        self.config.registry.max_runs = max_runs;
        self
    }

    pub fn with_retention(mut self, retention: &str) -> Self {
        self.config.registry.retention = retention.to_string();
        self
    }

    pub fn with_default_branch(mut self, branch: &str) -> Self {
        self.config.update.default_branch = branch.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry + broadcaster over the given runner with default limits.
pub fn registry_with(runner: Arc<dyn CommandRunner>) -> (ProcessRegistry, Broadcaster) {
    registry_with_limits(runner, RegistryLimits::default())
}

pub fn registry_with_limits(
    runner: Arc<dyn CommandRunner>,
    limits: RegistryLimits,
) -> (ProcessRegistry, Broadcaster) {
    let registry = ProcessRegistry::new(runner, limits);
    let broadcaster = Broadcaster::new(registry.clone());
    (registry, broadcaster)
}
