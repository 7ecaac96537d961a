// src/output/log.rs

//! Bounded, append-mostly line log for one run.

use std::collections::VecDeque;

use serde::Serialize;

use super::framer::FrameOp;

/// A framed line with its absolute position in the run's output.
///
/// Indices keep counting after old lines are evicted, so a cursor stays
/// meaningful for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub index: u64,
    pub text: String,
}

/// Result of applying one [`FrameOp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOp {
    pub index: u64,
    pub overwrite: bool,
    pub text: String,
}

/// Ordered framed output with FIFO eviction.
///
/// Lines are immutable once appended, except the most recent one, which a
/// `FrameOp::Overwrite` replaces in place. When more than `capacity` lines
/// are held, the oldest are dropped first.
#[derive(Debug, Clone)]
pub struct OutputLog {
    lines: VecDeque<String>,
    first_index: u64,
    capacity: usize,
}

impl OutputLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            first_index: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn apply(&mut self, op: &FrameOp) -> AppliedOp {
        match op {
            FrameOp::Overwrite(text) if !self.lines.is_empty() => {
                let index = self.len() - 1;
                if let Some(last) = self.lines.back_mut() {
                    last.clone_from(text);
                }
                AppliedOp {
                    index,
                    overwrite: true,
                    text: text.clone(),
                }
            }
            // Overwriting an empty log degrades to an append.
            FrameOp::Overwrite(text) | FrameOp::Append(text) => {
                self.lines.push_back(text.clone());
                while self.lines.len() > self.capacity {
                    self.lines.pop_front();
                    self.first_index += 1;
                }
                AppliedOp {
                    index: self.len() - 1,
                    overwrite: false,
                    text: text.clone(),
                }
            }
        }
    }

    /// Total number of lines ever appended (evicted ones included).
    pub fn len(&self) -> u64 {
        self.first_index + self.lines.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lines currently held.
    pub fn retained(&self) -> usize {
        self.lines.len()
    }

    /// Absolute index of the oldest retained line.
    pub fn first_index(&self) -> u64 {
        self.first_index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained lines at or after `cursor`.
    pub fn lines_from(&self, cursor: u64) -> Vec<LogLine> {
        let start = cursor.max(self.first_index);
        let skip = (start - self.first_index) as usize;
        self.lines
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(offset, text)| LogLine {
                index: self.first_index + offset as u64,
                text: text.clone(),
            })
            .collect()
    }

    pub fn line(&self, index: u64) -> Option<&str> {
        let offset = index.checked_sub(self.first_index)?;
        self.lines.get(offset as usize).map(String::as_str)
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}
