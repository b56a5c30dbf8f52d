//! Bundled cluster manifests and the applier that submits them.
//!
//! The manifests are compiled into the binary and applied byte-for-byte;
//! only the scratch file name varies per cluster.

use serde::Deserialize;
use strum::Display;
use tracing::info;

use crate::error::InstallerError;
use crate::oc::OpenShiftClient;
use crate::scratch::{PUBLIC_FILE_MODE, ScratchDir};
use crate::session::SessionHandle;

/// ImageContentSourcePolicy mirroring the ODF images to `quay.io/rhceph-dev`.
pub const IMAGE_CONTENT_SOURCE_POLICY: &str = include_str!("../manifests/icsp.yaml");

/// CatalogSource publishing the ODF operator catalog.
pub const CATALOG_SOURCE: &str = include_str!("../manifests/odf-catalogsource.yaml");

/// Kind of a bundled manifest; its display form is the scratch file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ManifestKind {
    #[strum(serialize = "icsp")]
    ImageContentSourcePolicy,
    #[strum(serialize = "catalogsource")]
    CatalogSource,
}

/// Identifying fields of a manifest, for logging and sanity checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestHeader {
    pub api_version: String,
    pub kind: String,
    pub metadata: ManifestMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// A static manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ManifestKind,
    pub document: &'static str,
}

impl Manifest {
    pub const fn new(kind: ManifestKind, document: &'static str) -> Self {
        Self { kind, document }
    }

    /// Scratch file suffix, e.g. `icsp.yaml`.
    pub fn file_suffix(&self) -> String {
        format!("{}.yaml", self.kind)
    }

    /// Parses the identifying fields of the document.
    pub fn header(&self) -> Result<ManifestHeader, InstallerError> {
        serde_yaml::from_str(self.document)
            .map_err(|e| InstallerError::malformed(format!("{} manifest", self.kind), e.to_string()))
    }
}

/// The manifests applied on every run, in apply order.
///
/// The mirroring policy comes first: the catalog image is pulled through it.
pub fn bundled_manifests() -> Vec<Manifest> {
    vec![
        Manifest::new(ManifestKind::ImageContentSourcePolicy, IMAGE_CONTENT_SOURCE_POLICY),
        Manifest::new(ManifestKind::CatalogSource, CATALOG_SOURCE),
    ]
}

/// Renders manifests into the scratch directory and applies them with `oc apply`.
pub struct ManifestApplier {
    client: OpenShiftClient,
    scratch: ScratchDir,
    manifests: Vec<Manifest>,
}

impl ManifestApplier {
    pub fn new(client: OpenShiftClient, scratch: ScratchDir, manifests: Vec<Manifest>) -> Self {
        Self {
            client,
            scratch,
            manifests,
        }
    }

    /// Applies one manifest under `session`.
    #[tracing::instrument(skip(self, session, manifest), fields(cluster = session.cluster(), kind = %manifest.kind))]
    pub fn apply(&self, session: &SessionHandle, manifest: &Manifest) -> Result<(), InstallerError> {
        let header = manifest.header()?;
        let path = self.scratch.write(
            session.cluster(),
            &manifest.file_suffix(),
            manifest.document.as_bytes(),
            PUBLIC_FILE_MODE,
        )?;

        info!(path = %path, name = %header.metadata.name, "applying {}", header.kind);

        self.client
            .apply(session, &path)
            .map_err(|e| InstallerError::Apply {
                manifest: header.kind.clone(),
                cluster: session.cluster().to_string(),
                reason: format!("{:#}", e),
            })
    }

    /// Applies every manifest in order, stopping at the first failure.
    pub fn apply_all(&self, session: &SessionHandle) -> Result<(), InstallerError> {
        for manifest in &self.manifests {
            self.apply(session, manifest)?;
        }
        Ok(())
    }
}
