//! Registry credential merging for the cluster pull secret.
//!
//! The pull secret and the output of `oc registry login` share one shape:
//!
//! ```json
//! { "auths": { "quay.io/rhceph-dev": { "auth": "..." } } }
//! ```
//!
//! [`ensure_registry_credential`] adds exactly one registry entry to the
//! pull secret and proves the result grew by one before anything is written
//! back to the cluster.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InstallerError;

/// Document label used in errors about the cluster pull secret.
pub const PULL_SECRET_DOCUMENT: &str = "pull secret";
/// Document label used in errors about the registry-login output.
pub const REGISTRY_CREDENTIAL_DOCUMENT: &str = "registry credential";

const AUTHS_FIELD: &str = "auths";

/// A docker-config style credential bundle.
///
/// `auths` maps a registry host path to an opaque credential record. Any
/// other top-level field is carried along in `extra` so that rewriting the
/// document never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthDocument {
    pub auths: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The cluster-wide pull secret.
pub type PullSecret = AuthDocument;
/// Output of a registry login, expected to hold a single entry.
pub type RegistryCredential = AuthDocument;

impl AuthDocument {
    /// Parses and validates a credential bundle.
    ///
    /// `document` names the bundle in error messages.
    pub fn parse(raw: &[u8], document: &str) -> Result<Self, InstallerError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| InstallerError::malformed(document, format!("invalid JSON: {}", e)))?;

        let Value::Object(mut fields) = value else {
            return Err(InstallerError::malformed(document, "expected a JSON object"));
        };

        let auths = match fields.remove(AUTHS_FIELD) {
            Some(Value::Object(auths)) => auths.into_iter().collect(),
            Some(_) => {
                return Err(InstallerError::malformed(
                    document,
                    format!("`{}` field is not an object", AUTHS_FIELD),
                ));
            }
            None => {
                return Err(InstallerError::malformed(
                    document,
                    format!("missing `{}` field", AUTHS_FIELD),
                ));
            }
        };

        Ok(Self {
            auths,
            extra: fields,
        })
    }

    pub fn len(&self) -> usize {
        self.auths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }

    pub fn contains(&self, registry: &str) -> bool {
        self.auths.contains_key(registry)
    }

    /// Right-biased union: entries of `other` overwrite entries with the same key.
    pub fn merge(mut self, other: Self) -> Self {
        self.auths.extend(other.auths);
        self.extra.extend(other.extra);
        self
    }

    pub fn to_json(&self) -> Result<Vec<u8>, InstallerError> {
        serde_json::to_vec(self)
            .map_err(|e| InstallerError::malformed(PULL_SECRET_DOCUMENT, e.to_string()))
    }
}

/// Result of [`ensure_registry_credential`].
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The registry was already configured; nothing needs to be written.
    AlreadyPresent,
    /// The pull secret with the new registry entry added.
    Merged(PullSecret),
}

/// Ensures `registry` has an entry in `pull_secret`.
///
/// `obtain` produces the raw registry-login output and is only called when
/// the registry is missing, so re-running against a configured cluster does
/// not log in to the registry again.
pub fn ensure_registry_credential<F>(
    pull_secret: &[u8],
    registry: &str,
    obtain: F,
) -> Result<MergeOutcome, InstallerError>
where
    F: FnOnce() -> anyhow::Result<Vec<u8>>,
{
    let current = PullSecret::parse(pull_secret, PULL_SECRET_DOCUMENT)?;

    if current.contains(registry) {
        tracing::info!(registry, "registry credential already present in pull secret");
        return Ok(MergeOutcome::AlreadyPresent);
    }

    let raw = obtain().map_err(|e| InstallerError::CredentialAcquisitionFailed {
        registry: registry.to_string(),
        reason: format!("{:#}", e),
    })?;
    let credential = RegistryCredential::parse(&raw, REGISTRY_CREDENTIAL_DOCUMENT)?;

    let before = current.len();
    let produced: Vec<String> = credential.auths.keys().cloned().collect();
    let merged = current.merge(credential);
    verify_additive(before, &merged, registry, &produced)?;

    tracing::debug!(registry, before, after = merged.len(), "merged registry credential");
    Ok(MergeOutcome::Merged(merged))
}

/// Checks that the merge added exactly one entry, keyed by `registry`.
///
/// Catches a login that produced no entry, more than one entry, an entry
/// colliding with an existing key, or a single entry under another key.
/// `produced` lists the keys the login returned.
fn verify_additive(
    before: usize,
    merged: &PullSecret,
    registry: &str,
    produced: &[String],
) -> Result<(), InstallerError> {
    let expected = before + 1;
    if merged.len() != expected {
        return Err(InstallerError::MergeCountMismatch {
            registry: registry.to_string(),
            expected,
            actual: merged.len(),
        });
    }
    if !merged.contains(registry) {
        return Err(InstallerError::RegistryKeyMismatch {
            registry: registry.to_string(),
            produced: produced.to_vec(),
        });
    }
    Ok(())
}

/// Checks the pull secret read back from the cluster against the pushed document.
///
/// This only confirms the write landed; it does not detect a concurrent writer
/// that raced in between.
pub fn verify_persisted(
    reread: &[u8],
    merged: &PullSecret,
    cluster: &str,
    registry: &str,
) -> Result<(), InstallerError> {
    let live = PullSecret::parse(reread, PULL_SECRET_DOCUMENT)?;
    let not_persisted = |reason: String| InstallerError::NotPersisted {
        cluster: cluster.to_string(),
        registry: registry.to_string(),
        reason,
    };

    if !live.contains(registry) {
        return Err(not_persisted("registry entry missing".to_string()));
    }
    if live.len() != merged.len() {
        return Err(not_persisted(format!(
            "cluster holds {} auth entries, pushed {}",
            live.len(),
            merged.len()
        )));
    }
    Ok(())
}
