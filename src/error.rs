//! Domain-specific error types for odfdr-installer.
//!
//! This module defines `InstallerError`, a `thiserror`-based enum that
//! provides typed error variants for every way a provisioning run can fail.
//! Public API functions return `Result<T, InstallerError>` for programmatic
//! error handling, while the executor trait and the orchestrator use
//! `anyhow::Result`.
//!
//! `InstallerError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at boundaries that return `anyhow::Result`, and
//! callers can recover the typed error with `downcast_ref`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::AlreadyExists => "I/O error: already exists".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for odfdr-installer.
///
/// Every variant is fatal to the run; none are retried.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InstallerError {
    /// A precondition for the run was not met (missing flag, missing host command).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An external command could not be resolved on the executing host.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command name that was looked up.
        command: String,
    },

    /// The cluster identifier could not be derived from the API URL.
    #[error("could not parse cluster name from URL '{url}': {reason}")]
    ClusterName { url: String, reason: String },

    /// Logging in to the cluster failed.
    #[error("failed to log in to cluster {cluster}: {reason}")]
    Auth { cluster: String, reason: String },

    /// A pull-secret, registry-credential or manifest document has an unexpected shape.
    #[error("malformed {document} document: {reason}")]
    MalformedDocument {
        /// Which document was being parsed (e.g., "pull secret").
        document: String,
        reason: String,
    },

    /// The registry login that produces the new credential failed.
    #[error("failed to obtain credential for registry {registry}: {reason}")]
    CredentialAcquisitionFailed { registry: String, reason: String },

    /// The merged pull secret does not hold exactly one more entry than before.
    #[error(
        "merged pull secret has {actual} auth entries, expected {expected} after adding {registry}"
    )]
    MergeCountMismatch {
        registry: String,
        expected: usize,
        actual: usize,
    },

    /// The registry login returned a credential, but not for the requested registry.
    #[error("registry login for {registry} produced credentials for {produced:?}")]
    RegistryKeyMismatch {
        registry: String,
        /// Keys of the `auths` entries the login returned.
        produced: Vec<String>,
    },

    /// The pull secret read back from the cluster does not match the pushed document.
    #[error("pull secret on cluster {cluster} does not reflect the update for {registry}: {reason}")]
    NotPersisted {
        cluster: String,
        registry: String,
        reason: String,
    },

    /// The cluster rejected a manifest.
    #[error("failed to apply {manifest} to cluster {cluster}: {reason}")]
    Apply {
        manifest: String,
        cluster: String,
        reason: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, thread panic, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed, with secrets redacted.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually including a path.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    pub(crate) fn malformed(document: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            reason: reason.into(),
        }
    }
}
