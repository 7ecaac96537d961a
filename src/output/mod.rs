// src/output/mod.rs

//! Output framing and buffering.
//!
//! - [`framer`] turns raw chunks into append/overwrite line operations.
//! - [`log`] stores those lines per run with a bounded FIFO buffer.

pub mod framer;
pub mod log;

pub use framer::{FrameOp, OutputFramer, exit_status_line};
pub use log::{AppliedOp, LogLine, OutputLog};
