//! Plan command: list descriptors without downloading anything.

use super::common::print_descriptors;
use anyhow::Result;
use kbin_core::config::KbinConfig;
use kbin_core::plan::{self, ArtifactManifest};
use std::collections::BTreeMap;
use std::path::Path;

pub fn run_plan(
    cfg: &KbinConfig,
    kube_version: &str,
    arches: &[String],
    manifest_path: Option<&Path>,
) -> Result<()> {
    let manifest = manifest_path.map(ArtifactManifest::load).transpose()?;
    let mut by_arch = BTreeMap::new();
    for arch in arches {
        let descriptors = match &manifest {
            Some(m) => plan::artifact_plan(cfg, m, kube_version, arch)?,
            None => plan::cluster_plan(cfg, kube_version, arch)?,
        };
        by_arch.insert(arch.as_str(), descriptors);
    }
    print_descriptors(&by_arch, false)
}
