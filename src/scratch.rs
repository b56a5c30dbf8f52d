//! Per-run scratch files.
//!
//! Every file a run produces (session kubeconfig, pull-secret snapshots,
//! rendered manifests) lives in one directory and is named after the cluster.
//! Files are left in place after the run for the operator to inspect.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::InstallerError;

/// Mode for files holding credentials.
pub const SECRET_FILE_MODE: u32 = 0o600;
/// Mode for rendered manifests.
pub const PUBLIC_FILE_MODE: u32 = 0o644;

/// Sets Unix file permissions on the given path.
#[cfg(unix)]
pub(crate) fn set_file_mode(path: &Utf8Path, mode: u32) -> Result<(), InstallerError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .map_err(|e| InstallerError::io(format!("failed to read metadata for {}", path), e))?
        .permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
        .map_err(|e| InstallerError::io(format!("failed to set permissions on {}", path), e))
}

/// Directory holding the scratch files of one run.
///
/// In dry-run mode paths are still computed, but nothing is written.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: Utf8PathBuf,
    dry_run: bool,
}

impl ScratchDir {
    pub fn new(root: impl Into<Utf8PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
        }
    }

    /// Path of a scratch file named `<cluster>-<suffix>`.
    pub fn path(&self, cluster: &str, suffix: &str) -> Utf8PathBuf {
        self.root.join(format!("{}-{}", cluster, suffix))
    }

    /// Writes `contents` to `<cluster>-<suffix>` and applies `mode`.
    ///
    /// Existing files are overwritten, so a re-run replaces the previous snapshot.
    pub fn write(
        &self,
        cluster: &str,
        suffix: &str,
        contents: &[u8],
        mode: u32,
    ) -> Result<Utf8PathBuf, InstallerError> {
        let path = self.path(cluster, suffix);
        if self.dry_run {
            tracing::info!(path = %path, "dry run: not writing scratch file");
            return Ok(path);
        }
        fs::write(&path, contents)
            .map_err(|e| InstallerError::io(format!("failed to write {}", path), e))?;
        #[cfg(unix)]
        set_file_mode(&path, mode)?;
        #[cfg(not(unix))]
        let _ = mode;
        tracing::debug!(path = %path, bytes = contents.len(), "wrote scratch file");
        Ok(path)
    }

    /// Creates a new, empty file `<cluster>-<prefix>-<uuid>` with mode 0600.
    ///
    /// The random suffix keeps concurrent or repeated runs from sharing a file.
    pub fn create_unique(&self, cluster: &str, prefix: &str) -> Result<Utf8PathBuf, InstallerError> {
        let path = self.path(cluster, &format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        if self.dry_run {
            return Ok(path);
        }
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| InstallerError::io(format!("failed to create {}", path), e))?;
        #[cfg(unix)]
        set_file_mode(&path, SECRET_FILE_MODE)?;
        Ok(path)
    }

    /// Reads a file previously produced in this directory.
    pub fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, InstallerError> {
        fs::read(path).map_err(|e| InstallerError::io(format!("failed to read {}", path), e))
    }
}
