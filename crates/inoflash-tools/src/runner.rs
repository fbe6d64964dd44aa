//! Command runner abstraction
//!
//! Every external tool invocation goes through [`CommandRunner`], so the
//! pipeline can be exercised with [`DryRunRunner`] instead of real tools.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Result, ToolError};

/// A fully built external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<OsString>,
}

impl ToolCommand {
    /// Start a command for `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy strings, for inspection
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.contains(char::is_whitespace) {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// Result of running a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (`None` if killed by a signal)
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Output of a successful run
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    /// Whether the command exited with status 0
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run external commands
pub trait CommandRunner {
    /// Run a command to completion
    ///
    /// A non-zero exit is reported in the returned output, not as an error.
    fn run(&mut self, command: &ToolCommand) -> Result<CommandOutput>;

    /// Run a command and fail unless it exits with status 0
    fn run_checked(&mut self, command: &ToolCommand) -> Result<CommandOutput> {
        let output = self.run(command)?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(ToolError::Failed {
                command: command.to_string(),
                code: output.code,
            })
        }
    }
}

/// Runs commands as child processes, streaming their output to the console
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, command: &ToolCommand) -> Result<CommandOutput> {
        log::debug!("Executing: {}", command);

        let mut process = Command::new(&command.program);
        process.args(&command.args).stdin(Stdio::null());

        let status = process.status().map_err(|source| ToolError::Launch {
            program: command.program.display().to_string(),
            source,
        })?;
        Ok(CommandOutput {
            code: status.code(),
        })
    }
}

/// Records commands without executing them
///
/// Every command succeeds. Used for `--dry-run` and in tests.
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner {
    /// Commands seen so far, in order
    pub commands: Vec<ToolCommand>,
}

impl DryRunRunner {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, command: &ToolCommand) -> Result<CommandOutput> {
        log::info!("[dry-run] {}", command);
        self.commands.push(command.clone());
        Ok(CommandOutput::success())
    }
}
