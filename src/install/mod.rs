// src/install/mod.rs

//! Dependency installation.
//!
//! - [`fallback`] runs an ordered list of [`InstallAttempt`]s until one
//!   succeeds.
//! - [`plan`] builds the attempt lists (pip mirror, pypi.org, `uv pip`; node
//!   package manager installs).
//! - [`pm`] picks the node package manager and Python tooling on the host.
//! - [`projects`] finds the installable projects of a workspace.
//! - [`workspace`] ties it together into a full workspace bootstrap.
//! - [`progress`] runs single steps and reports progress to a sink.

pub mod attempt;
pub mod fallback;
pub mod plan;
pub mod pm;
pub mod progress;
pub mod projects;
pub mod workspace;

pub use attempt::{DryRunReport, InstallAttempt};
pub use fallback::{FallbackInstaller, InstallOutcome};
pub use pm::{PackageManager, choose_package_manager};
pub use progress::{NullSink, ProgressSink, StepRun, run_step};
pub use workspace::{
    InstallOptions, InstallReport, ProjectInstall, ProjectStatus, PythonStatus,
    WorkspaceInstaller,
};
