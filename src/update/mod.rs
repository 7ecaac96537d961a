// src/update/mod.rs

//! Source synchronisation of the workspace checkouts.
//!
//! Safe mode: fetch, then fast-forward, falling back to rebase with
//! autostash. Forced mode: fetch, hard reset onto `origin/<branch>`, then
//! `git clean -fdx`. Either may be followed by a forced dependency
//! re-install.

pub mod branch;
pub mod orchestrator;

pub use branch::{BranchSource, GitHeadQuery, HeadQuery, ResolvedBranch, resolve_branch};
pub use orchestrator::{
    CheckoutUpdate, ReinstallOutcome, UpdateOptions, UpdateOrchestrator, UpdateReport,
    UpdateStep,
};
