//! Cluster login and the session handle shared by all later `oc` calls.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::error::InstallerError;
use crate::oc::OpenShiftClient;
use crate::scratch::ScratchDir;

const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Authenticated access to one cluster, backed by a scratch kubeconfig file.
///
/// The handle lives for a single run and is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    cluster: String,
    kubeconfig: Utf8PathBuf,
}

impl SessionHandle {
    pub fn new(cluster: impl Into<String>, kubeconfig: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cluster: cluster.into(),
            kubeconfig: kubeconfig.into(),
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn kubeconfig(&self) -> &Utf8Path {
        &self.kubeconfig
    }

    /// Environment variable through which `oc` receives the kubeconfig.
    pub fn env_key(&self) -> &'static str {
        KUBECONFIG_ENV
    }
}

/// Logs in to `url` and returns the resulting session.
///
/// A fresh `<cluster>-kubeconfig-<uuid>` file is created for every call.
#[tracing::instrument(skip(client, scratch, password))]
pub fn open_session(
    client: &OpenShiftClient,
    scratch: &ScratchDir,
    cluster: &str,
    url: &str,
    username: &str,
    password: &str,
) -> Result<SessionHandle, InstallerError> {
    let kubeconfig = scratch.create_unique(cluster, "kubeconfig")?;
    let session = SessionHandle::new(cluster, kubeconfig);

    info!(kubeconfig = %session.kubeconfig(), "logging in using kubeconfig");

    client
        .login(&session, url, username, password)
        .map_err(|e| InstallerError::Auth {
            cluster: cluster.to_string(),
            reason: format!("{:#}", e),
        })?;

    Ok(session)
}
