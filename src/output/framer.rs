// src/output/framer.rs

//! Carriage-return aware line framing.
//!
//! Raw output arrives in chunks that ignore line boundaries. The framer turns
//! them into two kinds of operations on a line log:
//!
//! - `Append(text)`: a new line starts.
//! - `Overwrite(text)`: the most recent line is replaced.
//!
//! Rules:
//! - A chunk beginning with `\r` replaces the most recent line, whether or
//!   not it was terminated. This is how progress spinners redraw.
//! - Otherwise the chunk is split on `\n`. Each terminated segment completes
//!   a line; the trailing unterminated segment becomes the *in-progress*
//!   line, which is already visible in the log and keeps being overwritten as
//!   more text for it arrives.
//! - Inside a segment, text after an embedded `\r` rewrites the in-progress
//!   line. A `\r` right before `\n` is a CRLF terminator and is dropped.
//! - A `\r` ending a chunk is carried over: the next chunk rewrites the
//!   in-progress line exactly as if both had arrived in one read.
//!
//! The framer is a pure state machine: the same chunk sequence always yields
//! the same operation sequence.

use serde::Serialize;

/// One framing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "text", rename_all = "lowercase")]
pub enum FrameOp {
    Append(String),
    Overwrite(String),
}

impl FrameOp {
    pub fn text(&self) -> &str {
        match self {
            FrameOp::Append(t) | FrameOp::Overwrite(t) => t,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputFramer {
    /// Content of the in-progress (unterminated) line, if any.
    open: Option<String>,
    /// Whether any line has been emitted yet.
    has_line: bool,
    /// The previous chunk ended in `\r`.
    pending_cr: bool,
}

impl OutputFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk.
    pub fn push(&mut self, chunk: &str) -> Vec<FrameOp> {
        let mut ops = Vec::new();
        if chunk.is_empty() {
            return ops;
        }

        let mut carried_cr = std::mem::replace(&mut self.pending_cr, chunk.ends_with('\r'));
        let (mut replace_last, body) = match chunk.strip_prefix('\r') {
            Some(rest) => (true, rest),
            None => (false, chunk),
        };

        let mut segments = body.split('\n').peekable();
        while let Some(raw) = segments.next() {
            let terminated = segments.peek().is_some();
            let (text, rewrite) = visible_text(raw);
            self.apply(text, replace_last, rewrite || carried_cr, terminated, &mut ops);
            replace_last = false;
            carried_cr = false;
        }

        ops
    }

    /// Complete the stream: close the in-progress line and append the
    /// synthetic status line for the given exit code.
    pub fn finish(&mut self, code: Option<i32>) -> Vec<FrameOp> {
        self.finish_with(exit_status_line(code))
    }

    /// Complete the stream with an arbitrary final status line.
    pub fn finish_with(&mut self, status_line: String) -> Vec<FrameOp> {
        self.open = None;
        self.has_line = true;
        self.pending_cr = false;
        vec![FrameOp::Append(status_line)]
    }

    /// Whether a line is currently in progress.
    pub fn has_open_line(&self) -> bool {
        self.open.is_some()
    }

    fn apply(
        &mut self,
        text: &str,
        replace_last: bool,
        rewrite: bool,
        terminated: bool,
        ops: &mut Vec<FrameOp>,
    ) {
        if text.is_empty() {
            // A bare terminator closes the in-progress line, or is an empty line.
            if terminated && self.open.take().is_none() {
                ops.push(FrameOp::Append(String::new()));
                self.has_line = true;
            }
            return;
        }

        let replaces_existing =
            (replace_last && self.has_line) || (rewrite && self.open.is_some());

        let line = if replaces_existing {
            self.open = None;
            ops.push(FrameOp::Overwrite(text.to_string()));
            text.to_string()
        } else if let Some(mut open) = self.open.take() {
            open.push_str(text);
            ops.push(FrameOp::Overwrite(open.clone()));
            open
        } else {
            ops.push(FrameOp::Append(text.to_string()));
            text.to_string()
        };

        self.has_line = true;
        if !terminated {
            self.open = Some(line);
        }
    }
}

/// Resolve embedded carriage returns in one segment.
///
/// Returns the visible text (the last non-empty `\r`-separated piece) and
/// whether it came after a `\r`, i.e. rewrites the line rather than extends it.
fn visible_text(raw: &str) -> (&str, bool) {
    let mut visible = "";
    let mut rewrite = false;
    let mut seen_cr = false;

    for piece in raw.split('\r') {
        if !piece.is_empty() {
            visible = piece;
            rewrite = seen_cr;
        }
        seen_cr = true;
    }

    (visible, rewrite)
}

/// Synthetic status line appended when a process ends.
pub fn exit_status_line(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("Process exited with code {code}"),
        None => "Process terminated by signal".to_string(),
    }
}
