// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{
    InstallAfter, InstallOnly, PackageManagerChoice, PythonToolChoice, UpdateMode, UpdateScope,
};

/// Command-line arguments for `runcast`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runcast",
    version,
    about = "Run workspace maintenance commands and stream their output live.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Runcast.toml` in the current working directory; defaults
    /// apply when it does not exist.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNCAST_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the HTTP control surface and live output streams.
    Serve(ServeArgs),
    /// Install node and Python dependencies across the workspace.
    Install(InstallArgs),
    /// Update the source checkouts, then re-install dependencies.
    ///
    /// `--mode force` hard-resets onto the remote branch and deletes
    /// untracked and ignored files. This cannot be undone.
    Update(UpdateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Override `[server].bind`, e.g. `127.0.0.1:7245`.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    #[arg(long, default_value_t = InstallOnly::All)]
    pub only: InstallOnly,

    /// Package manager (auto probes pnpm, npm, cnpm).
    #[arg(long, value_name = "PM")]
    pub pm: Option<PackageManagerChoice>,

    /// Python environment tool.
    #[arg(long, value_name = "TOOL")]
    pub py: Option<PythonToolChoice>,

    /// Reinstall even when `node_modules` / `.venv` already exist.
    #[arg(long)]
    pub force: bool,

    /// Print what would run without launching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Alternate Python package index tried before pypi.org.
    #[arg(long, value_name = "URL")]
    pub pip_index: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    #[arg(long, default_value_t = UpdateMode::Safe)]
    pub mode: UpdateMode,

    #[arg(long, default_value_t = UpdateScope::All)]
    pub scope: UpdateScope,

    /// Dependencies re-installed after the update.
    #[arg(long, default_value_t = InstallAfter::Node)]
    pub install: InstallAfter,

    /// Package manager for the re-install; defaults to the configured one.
    #[arg(long, value_name = "PM")]
    pub pm: Option<PackageManagerChoice>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
