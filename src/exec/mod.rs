// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually launching external commands with
//! `tokio::process::Command` and reporting their output and exit back as
//! [`RunnerEvent`]s.
//!
//! - [`command`] holds the immutable [`CommandSpec`].
//! - [`backend`] provides the `CommandRunner` trait, which tests replace with
//!   a scripted fake.
//! - [`process`] is the production runner.
//! - [`decode`] turns raw pipe reads into text without splitting characters.
//! - [`probe`] checks which tools exist on the host.
//! - [`resolve`] finds the program to spawn and decides whether it needs
//!   `cmd /C` on Windows.

pub mod backend;
pub mod command;
pub mod decode;
pub mod probe;
pub mod process;
pub mod resolve;

pub use backend::{CancelHandle, CommandRunner, RunHandle, RunnerEvent};
pub use command::CommandSpec;
pub use probe::{SystemProbe, ToolProbe};
pub use process::ProcessRunner;
