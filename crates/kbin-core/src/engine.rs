//! Acquisition engine: the fetch-verify-cache loop over a batch of descriptors.
//!
//! Descriptors are processed strictly one at a time, in order:
//! ensure the base directory, reuse an existing file if it verifies, otherwise
//! delete it and download. The first fatal error aborts the batch, and the
//! result registry is only written once every descriptor (and the optional
//! legacy helm2 fetch) has succeeded.

use crate::artifact::{ArtifactDescriptor, Identity};
use crate::checksum::IntegrityChecker;
use crate::dedup::dedup_by_identity;
use crate::error::AcquisitionError;
use crate::executor::DownloadExecutor;
use crate::registry::{BinarySet, ResultRegistry};
use std::fs;

/// KubeSphere release that still needs the helm2 client next to helm3.
pub const LEGACY_KUBESPHERE_VERSION: &str = "v2.1.1";
/// helm2 release fetched for [`LEGACY_KUBESPHERE_VERSION`].
pub const LEGACY_HELM_VERSION: &str = "v2.16.9";

/// Fixed source for the legacy helm2 client.
pub fn legacy_helm_url(arch: &str) -> String {
    format!(
        "https://kubernetes-helm.pek3b.qingstor.com/linux-{}/{}/helm",
        arch, LEGACY_HELM_VERSION
    )
}

/// How a single descriptor ended up satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A valid file was already on disk.
    Satisfied,
    /// The executor fetched it during this batch.
    Acquired,
}

/// Result of a successful batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Resolved descriptors by id, as written to the registry.
    pub binaries: BinarySet,
    pub downloaded: Vec<Identity>,
    pub satisfied: Vec<Identity>,
    /// Whether the legacy helm2 client was fetched.
    pub legacy_fetched: bool,
}

pub struct AcquisitionEngine<'a> {
    executor: &'a dyn DownloadExecutor,
    checker: &'a IntegrityChecker,
    registry: &'a ResultRegistry,
}

impl<'a> AcquisitionEngine<'a> {
    pub fn new(
        executor: &'a dyn DownloadExecutor,
        checker: &'a IntegrityChecker,
        registry: &'a ResultRegistry,
    ) -> Self {
        Self {
            executor,
            checker,
            registry,
        }
    }

    /// Ensures every descriptor is present and valid on disk, then records the
    /// set under `kube-binaries-<arch>`.
    ///
    /// `kubesphere_version` gates the legacy helm2 fetch; it only fires for
    /// exactly [`LEGACY_KUBESPHERE_VERSION`].
    pub fn acquire_batch(
        &self,
        arch: &str,
        descriptors: Vec<ArtifactDescriptor>,
        kubesphere_version: Option<&str>,
    ) -> Result<BatchOutcome, AcquisitionError> {
        // Checked up front: a mixed batch would be registered under the wrong key.
        if let Some(stray) = descriptors.iter().find(|d| d.arch() != arch) {
            return Err(AcquisitionError::ArchMismatch {
                id: stray.id().to_string(),
                expected: arch.to_string(),
                found: stray.arch().to_string(),
            });
        }

        let mut outcome = BatchOutcome::default();

        for descriptor in dedup_by_identity(descriptors) {
            let identity = descriptor.identity();
            match self.acquire_one(&descriptor)? {
                Outcome::Satisfied => outcome.satisfied.push(identity),
                Outcome::Acquired => outcome.downloaded.push(identity),
            }
            // First descriptor per id is the one downstream stages see.
            outcome
                .binaries
                .entry(descriptor.id().to_string())
                .or_insert(descriptor);
        }

        if kubesphere_version == Some(LEGACY_KUBESPHERE_VERSION) {
            outcome.legacy_fetched = self.legacy_fetch(outcome.binaries.get("helm"))?;
        }

        self.registry.set_binaries(arch, outcome.binaries.clone());
        tracing::info!(
            "{} binaries ready: {} downloaded, {} already present",
            arch,
            outcome.downloaded.len(),
            outcome.satisfied.len()
        );
        Ok(outcome)
    }

    fn acquire_one(&self, descriptor: &ArtifactDescriptor) -> Result<Outcome, AcquisitionError> {
        descriptor.ensure_base_dir()?;

        tracing::info!(
            "downloading {} {} {} ...",
            descriptor.arch(),
            descriptor.id(),
            descriptor.version()
        );

        let path = descriptor.path();
        if path.exists() {
            match self.checker.verify(descriptor) {
                Ok(_) => {
                    tracing::info!("{} is existed", descriptor.id());
                    return Ok(Outcome::Satisfied);
                }
                Err(e) => {
                    tracing::warn!("{}; removing {}", e, path.display());
                    if let Err(e) = fs::remove_file(&path) {
                        tracing::warn!("remove {} failed: {}", path.display(), e);
                    }
                }
            }
        }

        let url = descriptor.source_url();
        self.executor
            .download(&path, url)
            .map_err(|source| AcquisitionError::Download {
                id: descriptor.id().to_string(),
                version: descriptor.version().to_string(),
                command: self.executor.describe(&path, url),
                source,
            })?;

        match self.checker.verify(descriptor) {
            Ok(_) => Ok(Outcome::Acquired),
            Err(source) => Err(AcquisitionError::Integrity {
                id: descriptor.id().to_string(),
                version: descriptor.version().to_string(),
                source,
            }),
        }
    }

    /// Fetches `helm2` next to the helm binary if it is not already there.
    fn legacy_fetch(&self, helm: Option<&ArtifactDescriptor>) -> Result<bool, AcquisitionError> {
        let Some(helm) = helm else {
            tracing::warn!("legacy helm2 requested but no helm artifact in batch");
            return Ok(false);
        };
        tracing::info!("Downloading helm2 ...");

        let dest = helm.base_dir().join("helm2");
        if dest.exists() {
            return Ok(false);
        }
        let url = legacy_helm_url(helm.arch());
        self.executor
            .download(&dest, &url)
            .map_err(|source| AcquisitionError::LegacyDownload {
                command: self.executor.describe(&dest, &url),
                source,
            })?;
        Ok(true)
    }
}
