// src/exec/resolve.rs

//! Program lookup before spawning.
//!
//! On Windows, package managers ship as `.cmd` shims which only `cmd.exe`
//! can run. Those, and only those, are launched through `cmd /C`; everything
//! else is spawned directly so a missing binary is still a spawn error and a
//! kill reaches the real process.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use tokio::process::Command;

/// How a resolved program gets started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub program: PathBuf,
    /// The program is a batch shim and runs under `cmd /C`.
    pub via_shell: bool,
}

impl Launch {
    /// A command for this launch with `args` appended.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = if self.via_shell {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.program);
            c
        } else {
            Command::new(&self.program)
        };
        cmd.args(args);
        cmd
    }
}

/// Find `program` on `path_var` (or relative to `cwd` when it contains a
/// separator). A program that cannot be found is `ErrorKind::NotFound`.
pub fn resolve_program(program: &str, path_var: Option<&OsStr>, cwd: &Path) -> io::Result<Launch> {
    let found = which::which_in(program, path_var, cwd).map_err(|e| {
        io::Error::new(io::ErrorKind::NotFound, format!("{program}: {e}"))
    })?;
    let via_shell = is_batch_shim(&found);
    Ok(Launch {
        program: found,
        via_shell,
    })
}

/// `.cmd` / `.bat`, case-insensitively.
pub fn is_batch_shim(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cmd") || ext.eq_ignore_ascii_case("bat"))
}

/// Platform launch for `program`: resolved up front on Windows, spawned by
/// name elsewhere.
pub fn platform_launch(
    program: &str,
    path_var: Option<&OsStr>,
    cwd: Option<&Path>,
) -> io::Result<Launch> {
    if cfg!(windows) {
        let cwd = match cwd {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        resolve_program(program, path_var, &cwd)
    } else {
        Ok(Launch {
            program: PathBuf::from(program),
            via_shell: false,
        })
    }
}
