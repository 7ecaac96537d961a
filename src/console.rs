// src/console.rs

//! Terminal rendering of live run output for the CLI.

use std::io::{self, IsTerminal, Write};

use parking_lot::Mutex;

use crate::broadcast::{LineOp, StreamEvent};
use crate::install::ProgressSink;
use crate::registry::RunId;

/// Prints step banners and run output to STDOUT.
///
/// The most recent line is left without a trailing newline so that an
/// overwrite can redraw it in place, which keeps progress spinners on one
/// terminal row.
#[derive(Debug)]
pub struct ConsoleSink {
    /// A line has been printed without its newline yet.
    open: Mutex<bool>,
    /// STDOUT is a terminal, so ANSI line erasure is understood.
    erase_line: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(false),
            erase_line: io::stdout().is_terminal(),
        }
    }

    fn write(&self, render: impl FnOnce(&mut dyn Write, &mut bool) -> io::Result<()>) {
        let mut open = self.open.lock();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        // Output is best effort; a closed STDOUT must not fail a run.
        let _ = render(&mut out, &mut *open).and_then(|()| out.flush());
    }
}

impl ProgressSink for ConsoleSink {
    fn step(&self, message: &str) {
        self.write(|out, open| {
            if std::mem::take(open) {
                writeln!(out)?;
            }
            writeln!(out, "==> {message}")
        });
    }

    fn event(&self, _run_id: &RunId, event: &StreamEvent) {
        self.write(|out, open| render_event(out, open, event, self.erase_line));
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one stream event. `open` tracks whether the last line still lacks
/// its newline. Without `erase_line` an overwrite is a bare `\r`, which a
/// capturing parent reads as a redraw.
pub fn render_event(
    out: &mut dyn Write,
    open: &mut bool,
    event: &StreamEvent,
    erase_line: bool,
) -> io::Result<()> {
    match event {
        StreamEvent::Output {
            op: LineOp::Append,
            data,
            ..
        } => {
            if *open {
                writeln!(out)?;
            }
            *open = true;
            write!(out, "{data}")
        }
        StreamEvent::Output {
            op: LineOp::Overwrite,
            data,
            ..
        } => {
            *open = true;
            if erase_line {
                write!(out, "\r\x1b[2K{data}")
            } else {
                write!(out, "\r{data}")
            }
        }
        StreamEvent::Exit { .. } => {
            if std::mem::take(open) {
                writeln!(out)?;
            }
            Ok(())
        }
    }
}
