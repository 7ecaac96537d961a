// src/lib.rs

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod install;
pub mod logging;
pub mod output;
pub mod registry;
pub mod server;
pub mod types;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::cli::{CliArgs, Command, InstallArgs, UpdateArgs};
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::console::ConsoleSink;
use crate::exec::{ProcessRunner, SystemProbe};
use crate::fs::RealFileSystem;
use crate::install::{InstallOptions, WorkspaceInstaller};
use crate::registry::ProcessRegistry;
use crate::server::ScriptCommand;
use crate::update::{UpdateOptions, UpdateOrchestrator};

/// How a command ended when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The update went through but the dependency re-install did not.
    PartialSuccess,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::PartialSuccess => 2,
        }
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the process registry and broadcaster
/// - either the HTTP control surface or one in-process orchestration whose
///   runs are rendered live to STDOUT
pub async fn run(args: CliArgs) -> Result<Outcome> {
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;
    debug!(?cfg, "configuration loaded");

    match args.command {
        Command::Serve(serve) => {
            if let Some(bind) = serve.bind {
                cfg.server.bind = bind
                    .parse()
                    .with_context(|| format!("invalid --bind address '{bind}'"))?;
            }
            // Script runs start in the workspace root, so hand them an
            // absolute config path.
            let script_config = args
                .config
                .map(PathBuf::from)
                .map(|p| std::path::absolute(&p).unwrap_or(p));
            let scripts = ScriptCommand::current_exe(script_config, cfg.workspace.root.clone());
            server::serve(&cfg, scripts).await?;
            Ok(Outcome::Success)
        }
        Command::Install(install) => run_install(&cfg, install).await,
        Command::Update(update) => run_update(&cfg, update).await,
    }
}

/// Registry, broadcaster and console sink for one in-process orchestration.
fn local_stack(cfg: &ConfigFile) -> (Broadcaster, Arc<ConsoleSink>) {
    let registry = ProcessRegistry::new(Arc::new(ProcessRunner::new()), cfg.registry.limits);
    (Broadcaster::new(registry), Arc::new(ConsoleSink::new()))
}

async fn run_install(cfg: &ConfigFile, args: InstallArgs) -> Result<Outcome> {
    let (broadcaster, sink) = local_stack(cfg);
    let installer = WorkspaceInstaller::new(
        broadcaster,
        Arc::new(RealFileSystem),
        Arc::new(SystemProbe),
        sink,
        cfg.workspace.clone(),
    );

    let opts = InstallOptions {
        only: args.only,
        force: args.force,
        dry_run: args.dry_run,
        pip_index: args.pip_index.or_else(|| cfg.install.pip_index.clone()),
        package_manager: args.pm.unwrap_or(cfg.install.package_manager),
        python_tool: args.py.unwrap_or(cfg.install.python_tool),
    };
    info!(?opts, "workspace install");

    let report = installer.run(&opts).await?;
    debug!(?report, "install finished");
    Ok(Outcome::Success)
}

async fn run_update(cfg: &ConfigFile, args: UpdateArgs) -> Result<Outcome> {
    let (broadcaster, sink) = local_stack(cfg);
    let orchestrator = UpdateOrchestrator::new(
        broadcaster,
        Arc::new(RealFileSystem),
        Arc::new(SystemProbe),
        sink,
        cfg.clone(),
    );

    let opts = UpdateOptions {
        mode: args.mode,
        scope: args.scope,
        install_after: args.install,
        package_manager: args.pm,
    };
    info!(?opts, "workspace update");

    let report = orchestrator.run(&opts).await?;
    debug!(?report, "update finished");
    if report.is_partial() {
        Ok(Outcome::PartialSuccess)
    } else {
        Ok(Outcome::Success)
    }
}
