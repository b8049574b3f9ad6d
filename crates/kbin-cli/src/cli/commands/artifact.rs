//! Artifact command: binaries listed in an offline artifact manifest.

use super::common::{print_registry, with_engine};
use anyhow::Result;
use kbin_core::config::KbinConfig;
use kbin_core::plan::{self, ArtifactManifest};
use std::path::Path;

pub fn run_artifact(
    cfg: &KbinConfig,
    manifest_path: &Path,
    kube_version: &str,
    arches: &[String],
    json: bool,
) -> Result<()> {
    let manifest = ArtifactManifest::load(manifest_path)?;
    let registry = with_engine(cfg, arches, |engine, arch| {
        Ok(plan::download_artifact_binaries(
            engine,
            cfg,
            &manifest,
            kube_version,
            arch,
        )?)
    })?;
    print_registry(&registry, arches, json)
}
