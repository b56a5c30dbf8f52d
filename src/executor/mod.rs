//! Command execution abstraction for odfdr-installer.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`

mod pipe;
mod real;

use std::fmt;
use std::process::ExitStatus;

use anyhow::Result;

pub use real::RealCommandExecutor;

const REDACTED: &str = "<redacted>";

/// Formats string arguments into a space-separated, debug-quoted string.
///
/// Used by error messages and dry-run output to consistently format
/// command arguments (e.g., `"login" "api.ocp.example.com:6443"`).
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Specification for a command to be executed
#[derive(Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "oc")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
    /// Capture stdout into [`ExecutionResult::stdout`] instead of logging it
    pub capture_stdout: bool,
    /// Values that must never appear in logs or error messages
    secrets: Vec<String>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
            capture_stdout: false,
            secrets: Vec::new(),
        }
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Requests that stdout is captured and returned rather than logged.
    #[must_use]
    pub fn capturing_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Registers a secret value to be masked wherever the spec is displayed.
    ///
    /// Empty values are ignored, since masking them would mangle every argument.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// Returns the arguments with every registered secret replaced.
    pub fn redacted_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                self.secrets
                    .iter()
                    .fold(arg.clone(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
            })
            .collect()
    }

    /// Human-readable command line with secrets redacted.
    pub fn display(&self) -> String {
        let args = self.redacted_args();
        if args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, format_command_args(&args))
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.command)
            .field("args", &self.redacted_args())
            .field("env", &self.env)
            .field("capture_stdout", &self.capture_stdout)
            .finish_non_exhaustive()
    }
}

/// Result of command execution
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
    /// Captured stdout, present only when [`CommandSpec::capture_stdout`] was set
    /// and the command actually ran
    pub stdout: Option<Vec<u8>>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` to allow the executor to be shared
/// as `Arc<dyn CommandExecutor>` between the collaborators of a run.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;

    /// Checks that `command` can be executed on this host.
    ///
    /// The default accepts every command, which suits executors that do not
    /// spawn real processes.
    fn ensure_available(&self, _command: &str) -> Result<()> {
        Ok(())
    }
}
