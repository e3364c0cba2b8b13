//! External command execution seam
//!
//! Every git/makepkg/nvchecker/gh invocation goes through the
//! `CommandRunner` trait so the pipeline is testable without the real
//! tools installed.

use crate::error::BuildToolError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Captured output of one finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by signal)
    pub code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CommandOutput {
    /// True when the command exited zero
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A request to run one external command
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, not including the program itself
    pub args: Vec<String>,
    /// Working directory; always set explicitly, never inherited ambiently
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a spec for the given program and arguments
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Sets the working directory
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Adds an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Rendering used in error messages and logs
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Seam for running external commands
pub trait CommandRunner: Send + Sync {
    /// Runs the command and captures its output; non-zero exit is not an
    /// error at this level
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError>;

    /// Runs the command and requires a zero exit code
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError> {
        let output = self.run(spec)?;
        if output.success() {
            Ok(output)
        } else {
            Err(BuildToolError::command_failed(
                spec.display(),
                output.code,
                output.stderr.trim(),
            ))
        }
    }
}

/// Production runner backed by `std::process::Command`
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, BuildToolError> {
        debug!(command = %spec.display(), cwd = ?spec.cwd, "running command");

        let mut command = Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(ref dir) = spec.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &spec.envs {
            command.env(key, value);
        }

        let output = command
            .output()
            .map_err(|e| BuildToolError::spawn_failed(&spec.program, e.to_string()))?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Convenience for call sites holding a `&dyn CommandRunner`
pub fn run_in<'a>(
    runner: &dyn CommandRunner,
    dir: &Path,
    program: &str,
    args: &[&'a str],
) -> Result<CommandOutput, BuildToolError> {
    runner.run_checked(&CommandSpec::new(program, args).cwd(dir))
}
