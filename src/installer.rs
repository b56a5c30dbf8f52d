//! Orchestrator for a provisioning run.
//!
//! A run executes these steps in order and stops at the first failure:
//!
//! 1. **preflight** — required host commands resolve
//! 2. **login** — open a session on the cluster derived from the URL
//! 3. **pull secret** — merge the registry credential into the cluster pull secret
//! 4. **manifests** — apply the mirroring policy, then the catalog source
//!
//! Earlier steps are not rolled back when a later one fails. Every step is
//! safe to repeat, so the remedy for a failed run is to fix the cause and
//! run again.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::InstallConfig;
use crate::credential::{self, MergeOutcome};
use crate::error::InstallerError;
use crate::executor::CommandExecutor;
use crate::manifest::{ManifestApplier, bundled_manifests};
use crate::oc::{OpenShiftClient, REQUIRED_COMMANDS};
use crate::scratch::{SECRET_FILE_MODE, ScratchDir};
use crate::session::{self, SessionHandle};

const STEP_PREFLIGHT: &str = "preflight";
const STEP_LOGIN: &str = "login";
const STEP_PULL_SECRET: &str = "pull secret";
const STEP_MANIFESTS: &str = "manifests";

/// Scratch file suffixes of the pull-secret step.
pub const PULL_SECRET_FILE: &str = "pull-secret.json";
pub const APPEND_PULL_SECRET_FILE: &str = "append-pull-secret.json";
pub const NEW_PULL_SECRET_FILE: &str = "new-pull-secret.json";

/// Context attached to the error of a failed step.
///
/// Recover it with `err.downcast_ref::<StepFailure>()` on the error returned
/// by [`Installer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: &'static str,
    /// `None` when the run failed before the cluster name was derived.
    pub cluster: Option<String>,
}

impl StepFailure {
    fn new(step: &'static str, cluster: Option<&str>) -> Self {
        Self {
            step,
            cluster: cluster.map(str::to_string),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step failed", self.step)
    }
}

/// Runs the provisioning sequence against one cluster.
pub struct Installer {
    config: InstallConfig,
    client: OpenShiftClient,
    scratch: ScratchDir,
    applier: ManifestApplier,
}

impl Installer {
    /// Creates an installer applying the bundled manifests.
    pub fn new(config: InstallConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        let client = OpenShiftClient::new(executor);
        let scratch = ScratchDir::new(config.work_dir.clone(), config.dry_run);
        let applier = ManifestApplier::new(client.clone(), scratch.clone(), bundled_manifests());
        Self {
            config,
            client,
            scratch,
            applier,
        }
    }

    /// Executes every step in order.
    pub fn run(&self) -> Result<()> {
        self.preflight()
            .with_context(|| StepFailure::new(STEP_PREFLIGHT, None))?;

        let cluster = self
            .config
            .cluster_name()
            .with_context(|| StepFailure::new(STEP_LOGIN, None))?;
        info!(cluster = %cluster, url = %self.config.url, "provisioning cluster");

        let session = session::open_session(
            &self.client,
            &self.scratch,
            &cluster,
            &self.config.url,
            &self.config.username,
            &self.config.password,
        )
        .with_context(|| StepFailure::new(STEP_LOGIN, Some(cluster.as_str())))?;

        self.ensure_pull_secret(&session)
            .with_context(|| StepFailure::new(STEP_PULL_SECRET, Some(cluster.as_str())))?;

        info!(step = STEP_MANIFESTS, cluster = %cluster, "applying manifests");
        self.applier
            .apply_all(&session)
            .with_context(|| StepFailure::new(STEP_MANIFESTS, Some(cluster.as_str())))?;

        info!(cluster = %cluster, "cluster provisioned successfully");
        Ok(())
    }

    /// Fails fast when a host command needed later is missing.
    fn preflight(&self) -> Result<(), InstallerError> {
        let executor = self.client.executor();
        for command in REQUIRED_COMMANDS {
            executor
                .ensure_available(command)
                .map_err(|_| {
                    InstallerError::Precondition(format!(
                        "{} is not installed or not in PATH",
                        command
                    ))
                })?;
        }
        Ok(())
    }

    /// Merges the registry credential into the cluster pull secret.
    ///
    /// The secret is only overwritten after the merge has been verified, and
    /// the written secret is read back to confirm the update.
    pub fn ensure_pull_secret(&self, session: &SessionHandle) -> Result<()> {
        let cluster = session.cluster();
        let registry = self.config.registry.as_str();
        info!(step = STEP_PULL_SECRET, cluster, registry, "checking pull secret");

        let Some(current) = self
            .client
            .get_pull_secret(session)
            .context("failed to read pull secret")?
        else {
            info!("dry run: pull secret not read, skipping merge");
            return Ok(());
        };
        let snapshot =
            self.scratch
                .write(cluster, PULL_SECRET_FILE, &current, SECRET_FILE_MODE)?;

        let append_path = self.scratch.path(cluster, APPEND_PULL_SECRET_FILE);
        let outcome = credential::ensure_registry_credential(&current, registry, || {
            self.client
                .registry_login(session, registry, &self.config.registry_password, &append_path)
                .context("registry login failed")?;
            #[cfg(unix)]
            crate::scratch::set_file_mode(&append_path, SECRET_FILE_MODE)?;
            Ok(self.scratch.read(&append_path)?)
        })
        .with_context(|| format!("failed to merge {} into {}", append_path, snapshot))?;

        let merged = match outcome {
            MergeOutcome::AlreadyPresent => return Ok(()),
            MergeOutcome::Merged(merged) => merged,
        };

        let new_path =
            self.scratch
                .write(cluster, NEW_PULL_SECRET_FILE, &merged.to_json()?, SECRET_FILE_MODE)?;
        self.client
            .set_pull_secret(session, &new_path)
            .with_context(|| format!("failed to update pull secret from {}", new_path))?;

        let reread = self
            .client
            .get_pull_secret(session)
            .context("failed to re-read pull secret")?
            .unwrap_or_default();
        credential::verify_persisted(&reread, &merged, cluster, registry)?;

        info!(
            cluster,
            registry,
            entries = merged.len(),
            "registry credential added to pull secret"
        );
        Ok(())
    }
}
