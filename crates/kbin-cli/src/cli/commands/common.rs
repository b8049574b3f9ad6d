//! Engine wiring and output shared by the fetching commands.

use anyhow::Result;
use kbin_core::config::KbinConfig;
use kbin_core::engine::BatchOutcome;
use kbin_core::executor;
use kbin_core::{AcquisitionEngine, ArtifactDescriptor, IntegrityChecker, ResultRegistry};
use std::collections::BTreeMap;

/// Builds the executor and checker from `cfg` and runs `f` once per arch with
/// an engine sharing one registry. Stops at the first failing arch.
pub fn with_engine<F>(cfg: &KbinConfig, arches: &[String], mut f: F) -> Result<ResultRegistry>
where
    F: FnMut(&AcquisitionEngine<'_>, &str) -> Result<BatchOutcome>,
{
    let executor = executor::from_config(cfg);
    let checker = IntegrityChecker::new(cfg.checksum_table()?);
    if checker.table().is_empty() {
        tracing::warn!("no reference checksums configured; existing files will not be verified");
    }
    let registry = ResultRegistry::new();
    {
        let engine = AcquisitionEngine::new(executor.as_ref(), &checker, &registry);
        for arch in arches {
            let outcome = f(&engine, arch)?;
            if outcome.legacy_fetched {
                tracing::info!("fetched legacy helm2 client for {}", arch);
            }
        }
    }
    Ok(registry)
}

/// Prints the registered binaries for each arch, as a table or as JSON.
pub fn print_registry(registry: &ResultRegistry, arches: &[String], json: bool) -> Result<()> {
    let mut by_arch: BTreeMap<&str, Vec<ArtifactDescriptor>> = BTreeMap::new();
    for arch in arches {
        if let Some(set) = registry.binaries(arch) {
            by_arch.insert(arch, set.values().cloned().collect());
        }
    }
    print_descriptors(&by_arch, json)
}

pub fn print_descriptors(
    by_arch: &BTreeMap<&str, Vec<ArtifactDescriptor>>,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(by_arch)?);
        return Ok(());
    }
    for (arch, descriptors) in by_arch {
        println!("{}:", arch);
        for d in descriptors {
            println!("  {:<8} {:<10} {}", d.id(), d.version(), d.path().display());
        }
    }
    Ok(())
}
