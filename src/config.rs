//! Run configuration.
//!
//! There is no configuration file: everything comes from the command line,
//! plus the fixed names of the OpenShift objects the installer touches.

use std::fmt;

use camino::Utf8PathBuf;

use crate::cli::InstallArgs;
use crate::error::InstallerError;

/// Registry whose credential is merged into the pull secret.
pub const RHCEPH_REGISTRY: &str = "quay.io/rhceph-dev";
/// Namespace holding the cluster-wide pull secret.
pub const PULL_SECRET_NAMESPACE: &str = "openshift-config";
/// Name of the cluster-wide pull secret.
pub const PULL_SECRET_NAME: &str = "pull-secret";
/// Data key of the pull secret.
pub const PULL_SECRET_KEY: &str = ".dockerconfigjson";
/// Account created by the OpenShift installer.
pub const DEFAULT_USERNAME: &str = "kubeadmin";

/// Everything a run needs, resolved from the command line.
#[derive(Clone)]
pub struct InstallConfig {
    /// OpenShift API URL, e.g. `api.ocp.example.com:6443`.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Value handed to `oc registry login --auth-basic`.
    pub registry_password: String,
    pub registry: String,
    /// Directory receiving the per-run scratch files.
    pub work_dir: Utf8PathBuf,
    pub dry_run: bool,
}

impl InstallConfig {
    pub fn from_args(args: &InstallArgs) -> Self {
        Self {
            url: args.url.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
            registry_password: args.rhceph_password.clone(),
            registry: RHCEPH_REGISTRY.to_string(),
            work_dir: args.work_dir.clone(),
            dry_run: args.dry_run,
        }
    }

    /// Cluster identifier derived from [`InstallConfig::url`].
    pub fn cluster_name(&self) -> Result<String, InstallerError> {
        cluster_name(&self.url)
    }
}

impl fmt::Debug for InstallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("registry_password", &"<redacted>")
            .field("registry", &self.registry)
            .field("work_dir", &self.work_dir)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Derives the cluster identifier from an API URL.
///
/// OpenShift API hosts look like `api.<cluster>.<base domain>`, so the
/// identifier is the second dot-separated label of the host. The scheme is
/// optional, as `oc login` accepts bare `host:port`.
///
/// The URL is validated with `url`, but the label is taken from the input
/// text, which keeps its case (`url` lowercases hosts).
pub fn cluster_name(url: &str) -> Result<String, InstallerError> {
    let parse_error = |reason: &str| InstallerError::ClusterName {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    let parsed = url::Url::parse(&with_scheme).map_err(|e| parse_error(&e.to_string()))?;
    if parsed.host_str().is_none() {
        return Err(parse_error("URL has no host"));
    }

    let mut labels = raw_host(&with_scheme).split('.');
    let _api = labels.next();
    match labels.next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        Some(_) => Err(parse_error("empty cluster label")),
        None => Err(parse_error("expected at least two dot-separated labels")),
    }
}

/// Host part of `url` as written: no scheme, userinfo, port or path.
fn raw_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    host.split(':').next().unwrap_or_default()
}
