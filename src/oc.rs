//! Invocations of the OpenShift CLI.
//!
//! Every call carries the [`SessionHandle`] explicitly as `KUBECONFIG`; the
//! installer never exports it into its own environment.

use std::sync::Arc;

use anyhow::Result;
use camino::Utf8Path;

use crate::config::{PULL_SECRET_KEY, PULL_SECRET_NAME, PULL_SECRET_NAMESPACE};
use crate::error::InstallerError;
use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::session::SessionHandle;

/// Name of the OpenShift CLI binary.
pub const OC: &str = "oc";

/// Host commands that must resolve before the run touches the cluster.
pub const REQUIRED_COMMANDS: &[&str] = &[OC];

/// Builds and runs `oc` commands through a [`CommandExecutor`].
#[derive(Clone)]
pub struct OpenShiftClient {
    executor: Arc<dyn CommandExecutor>,
}

impl OpenShiftClient {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// `oc login <url> -u <username> -p <password>`
    pub fn login(
        &self,
        session: &SessionHandle,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let spec = CommandSpec::new(
            OC,
            vec![
                "login".to_string(),
                url.to_string(),
                "-u".to_string(),
                username.to_string(),
                "-p".to_string(),
                password.to_string(),
            ],
        )
        .with_secret(password);
        self.run(session, spec).map(drop)
    }

    /// Reads the decoded `.dockerconfigjson` of the cluster pull secret.
    ///
    /// Returns `None` when the executor did not run the command (dry run).
    pub fn get_pull_secret(&self, session: &SessionHandle) -> Result<Option<Vec<u8>>> {
        let spec = CommandSpec::new(
            OC,
            vec![
                "get".to_string(),
                format!("secret/{}", PULL_SECRET_NAME),
                "-n".to_string(),
                PULL_SECRET_NAMESPACE.to_string(),
                format!("--template={{{{index .data \"{}\" | base64decode}}}}", PULL_SECRET_KEY),
            ],
        )
        .capturing_stdout();
        Ok(self.run(session, spec)?.stdout)
    }

    /// Replaces the pull secret data with the contents of `path`.
    pub fn set_pull_secret(&self, session: &SessionHandle, path: &Utf8Path) -> Result<()> {
        let spec = CommandSpec::new(
            OC,
            vec![
                "set".to_string(),
                "data".to_string(),
                format!("secret/{}", PULL_SECRET_NAME),
                "-n".to_string(),
                PULL_SECRET_NAMESPACE.to_string(),
                format!("--from-file={}={}", PULL_SECRET_KEY, path),
            ],
        );
        self.run(session, spec).map(drop)
    }

    /// `oc registry login`, writing the resulting credential bundle to `to`.
    pub fn registry_login(
        &self,
        session: &SessionHandle,
        registry: &str,
        auth_basic: &str,
        to: &Utf8Path,
    ) -> Result<()> {
        let spec = CommandSpec::new(
            OC,
            vec![
                "registry".to_string(),
                "login".to_string(),
                format!("--registry={}", registry),
                format!("--auth-basic={}", auth_basic),
                format!("--to={}", to),
            ],
        )
        .with_secret(auth_basic);
        self.run(session, spec).map(drop)
    }

    /// `oc apply -f <path>`
    pub fn apply(&self, session: &SessionHandle, path: &Utf8Path) -> Result<()> {
        let spec = CommandSpec::new(OC, vec!["apply".to_string(), "-f".to_string(), path.to_string()]);
        self.run(session, spec).map(drop)
    }

    fn run(&self, session: &SessionHandle, spec: CommandSpec) -> Result<ExecutionResult> {
        let spec = spec.with_env(session.env_key(), session.kubeconfig().as_str());
        tracing::debug!(cluster = session.cluster(), command = %spec.display(), "running oc");
        let result = self.executor.execute(&spec)?;
        check_execution_result(&result, &spec)?;
        Ok(result)
    }
}

/// Turns a non-zero exit status into an `Execution` error.
pub(crate) fn check_execution_result(
    result: &ExecutionResult,
    spec: &CommandSpec,
) -> Result<(), InstallerError> {
    match result.status {
        Some(status) if !status.success() => Err(InstallerError::Execution {
            command: spec.display(),
            status: status.to_string(),
        }),
        _ => Ok(()),
    }
}
