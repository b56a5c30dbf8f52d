//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command` with real-time output streaming, or with
//! stdout captured when the spec asks for it.

use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::Result;
use which::which;

use super::pipe::{StreamType, panic_message, read_pipe_to_log, read_pipe_to_vec};
use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::InstallerError;

/// Cleans up a child process and its associated reader threads.
///
/// Kills the child process, waits for it to terminate, and joins all
/// reader threads. Called from the error paths of
/// [`RealCommandExecutor::execute()`].
fn cleanup_child_process<T, I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<T>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

fn execution_error(spec: &CommandSpec, status: String) -> anyhow::Error {
    InstallerError::Execution {
        command: spec.display(),
        status,
    }
    .into()
}

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns `Ok(ExecutionResult { status: None, stdout: None })`.
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {}", spec.display());
            return Ok(ExecutionResult::default());
        }

        let cmd = which(&spec.command).map_err(|_| InstallerError::CommandNotFound {
            command: spec.command.clone(),
        })?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&spec.args);

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| execution_error(spec, format!("failed to spawn: {}", e)))?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let capture = spec.capture_stdout;

        let stdout_handle = match thread::Builder::new()
            .name("stdout-reader".to_string())
            .spawn(move || {
                if capture {
                    Some(read_pipe_to_vec(stdout_pipe))
                } else {
                    read_pipe_to_log(stdout_pipe, StreamType::Stdout);
                    None
                }
            }) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process::<(), _>(&mut child, []);
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stdout reader thread: {}", e),
                ));
            }
        };

        let stderr_handle = match thread::Builder::new()
            .name("stderr-reader".to_string())
            .spawn(move || -> Option<Vec<u8>> {
                read_pipe_to_log(stderr_pipe, StreamType::Stderr);
                None
            }) {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle]);
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stderr reader thread: {}", e),
                ));
            }
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                // The process might still be running.
                cleanup_child_process(&mut child, [stdout_handle, stderr_handle]);
                return Err(execution_error(spec, format!("failed to wait for command: {}", e)));
            }
        };

        let mut panicked_streams = Vec::new();
        let mut stdout = None;
        let handles = [("stdout", stdout_handle), ("stderr", stderr_handle)];
        for (name, handle) in handles {
            match handle.join() {
                Ok(captured) => {
                    if captured.is_some() {
                        stdout = captured;
                    }
                }
                Err(e) => {
                    let msg = panic_message(&*e);
                    tracing::error!(stream = name, panic = msg, "reader thread panicked");
                    panicked_streams.push(format!("{}: {}", name, msg));
                }
            }
        }

        if !panicked_streams.is_empty() {
            return Err(execution_error(
                spec,
                format!(
                    "reader thread(s) panicked during command execution: {}",
                    panicked_streams.join(", ")
                ),
            ));
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());

        Ok(ExecutionResult {
            status: Some(status),
            stdout,
        })
    }

    fn ensure_available(&self, command: &str) -> Result<()> {
        if self.dry_run {
            tracing::debug!("dry run: not checking for {}", command);
            return Ok(());
        }
        let path = which(command).map_err(|_| InstallerError::CommandNotFound {
            command: command.to_string(),
        })?;
        tracing::debug!("required command found: {}: {}", command, path.to_string_lossy());
        Ok(())
    }
}
