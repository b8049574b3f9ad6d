//! Fetch command: online install binaries for one or more arches.

use super::common::{print_registry, with_engine};
use anyhow::Result;
use kbin_core::config::KbinConfig;
use kbin_core::plan;

pub fn run_fetch(
    cfg: &KbinConfig,
    kube_version: &str,
    arches: &[String],
    kubesphere_version: Option<&str>,
    json: bool,
) -> Result<()> {
    let registry = with_engine(cfg, arches, |engine, arch| {
        Ok(plan::download_cluster_binaries(
            engine,
            cfg,
            kube_version,
            arch,
            kubesphere_version,
        )?)
    })?;
    print_registry(&registry, arches, json)
}
