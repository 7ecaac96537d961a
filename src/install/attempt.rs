// src/install/attempt.rs

use std::fmt;

use crate::exec::CommandSpec;

/// One fallback candidate for a logical install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallAttempt {
    pub label: String,
    pub spec: CommandSpec,
}

impl InstallAttempt {
    pub fn new(label: impl Into<String>, spec: CommandSpec) -> Self {
        Self {
            label: label.into(),
            spec,
        }
    }
}

/// What a dry run reports for one attempt it would have executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunReport {
    /// 1-based position in the attempt list.
    pub position: usize,
    pub total: usize,
    pub label: String,
    pub command: String,
}

impl fmt::Display for DryRunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[DRY] Attempt {}/{}: {} ({})",
            self.position, self.total, self.label, self.command
        )
    }
}
