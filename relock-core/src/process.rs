//! Captured subprocess execution.
//!
//! Every external tool invocation in the workspace goes through
//! [`run_captured`], which returns a tagged [`CmdOutput`] instead of the
//! raw `std::process::Output`. The exit status is folded into a single
//! `ok` flag; stdout/stderr are captured as lossy UTF-8 so they can be
//! logged and embedded in notification bodies.

use std::path::Path;
use std::process::{Command, Output};

use serde::Serialize;

/// Result of one captured external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdOutput {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn from_output(output: Output) -> Self {
        Self {
            ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Compact single-string rendering for problem messages.
    pub fn describe(&self) -> String {
        format!(
            "stdout: ``{}`` / stderr: ``{}``",
            self.stdout.trim(),
            self.stderr.trim()
        )
    }
}

/// Run `program` with `args`, capturing stdout and stderr.
///
/// `cwd` and extra environment variables are applied when given. Spawn
/// failures (missing binary, permission) surface as `Err`; a nonzero exit
/// is an `Ok` result with `ok == false`.
pub fn run_captured(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: &[(String, String)],
) -> std::io::Result<CmdOutput> {
    let mut command = Command::new(program);
    command.args(args.iter().map(String::as_str));
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command.output()?;
    Ok(CmdOutput::from_output(output))
}
