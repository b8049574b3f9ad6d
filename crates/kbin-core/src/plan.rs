//! Binary plans: which descriptors a node install or an offline artifact needs.
//!
//! `cluster_plan` covers an online install using the configured default
//! versions. `artifact_plan` reads versions from an artifact manifest and
//! fetches one docker bundle per distinct runtime version.

use crate::artifact::ArtifactDescriptor;
use crate::config::KbinConfig;
use crate::dedup::dedup_by_identity;
use crate::engine::{AcquisitionEngine, BatchOutcome};
use crate::error::{FetchError, PlanError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Container runtime type whose version maps directly onto a docker bundle.
pub const DOCKER_RUNTIME: &str = "docker";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentVersion {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRuntime {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    pub etcd: ComponentVersion,
    pub cni: ComponentVersion,
    pub helm: ComponentVersion,
    pub crictl: ComponentVersion,
    pub container_runtimes: Vec<ContainerRuntime>,
}

/// Offline artifact manifest (TOML).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactManifest {
    pub components: Components,
}

impl ArtifactManifest {
    pub fn from_toml_str(data: &str) -> Result<Self> {
        toml::from_str(data).context("parse artifact manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("load {}", path.display()))
    }
}

fn descriptor(cfg: &KbinConfig, id: &str, arch: &str, version: &str) -> Result<ArtifactDescriptor, PlanError> {
    ArtifactDescriptor::new(id, arch, version, &cfg.base_dir, cfg.zone)
}

/// Everything an online node install needs, in fetch order.
pub fn cluster_plan(
    cfg: &KbinConfig,
    kube_version: &str,
    arch: &str,
) -> Result<Vec<ArtifactDescriptor>, PlanError> {
    let d = &cfg.defaults;
    Ok(vec![
        descriptor(cfg, "kubeadm", arch, kube_version)?,
        descriptor(cfg, "kubelet", arch, kube_version)?,
        descriptor(cfg, "kubectl", arch, kube_version)?,
        descriptor(cfg, "helm", arch, &d.helm)?,
        descriptor(cfg, "kubecni", arch, &d.cni)?,
        descriptor(cfg, "docker", arch, &d.docker)?,
        descriptor(cfg, "crictl", arch, &d.crictl)?,
        descriptor(cfg, "etcd", arch, &d.etcd)?,
    ])
}

/// Docker versions requested by the runtime list, first-seen order, no repeats.
/// Runtimes other than docker still need the docker CLI bundle at the default version.
pub fn docker_plan(
    cfg: &KbinConfig,
    runtimes: &[ContainerRuntime],
    arch: &str,
) -> Result<Vec<ArtifactDescriptor>, PlanError> {
    let candidates = runtimes
        .iter()
        .map(|rt| {
            let version = if rt.kind == DOCKER_RUNTIME {
                rt.version.as_str()
            } else {
                cfg.defaults.docker.as_str()
            };
            descriptor(cfg, "docker", arch, version)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedup_by_identity(candidates))
}

/// Descriptors for an offline artifact built from `manifest`.
/// crictl is only included when the manifest pins a version.
pub fn artifact_plan(
    cfg: &KbinConfig,
    manifest: &ArtifactManifest,
    kube_version: &str,
    arch: &str,
) -> Result<Vec<ArtifactDescriptor>, PlanError> {
    let c = &manifest.components;
    let mut plan = vec![
        descriptor(cfg, "kubeadm", arch, kube_version)?,
        descriptor(cfg, "kubelet", arch, kube_version)?,
        descriptor(cfg, "kubectl", arch, kube_version)?,
        descriptor(cfg, "helm", arch, &c.helm.version)?,
        descriptor(cfg, "kubecni", arch, &c.cni.version)?,
        descriptor(cfg, "etcd", arch, &c.etcd.version)?,
    ];
    plan.extend(docker_plan(cfg, &c.container_runtimes, arch)?);
    if !c.crictl.version.is_empty() {
        plan.push(descriptor(cfg, "crictl", arch, &c.crictl.version)?);
    }
    Ok(plan)
}

/// Fetches the online install set for `arch` and registers it.
pub fn download_cluster_binaries(
    engine: &AcquisitionEngine<'_>,
    cfg: &KbinConfig,
    kube_version: &str,
    arch: &str,
    kubesphere_version: Option<&str>,
) -> Result<BatchOutcome, FetchError> {
    let plan = cluster_plan(cfg, kube_version, arch)?;
    Ok(engine.acquire_batch(arch, plan, kubesphere_version)?)
}

/// Fetches the artifact set described by `manifest` for `arch` and registers it.
pub fn download_artifact_binaries(
    engine: &AcquisitionEngine<'_>,
    cfg: &KbinConfig,
    manifest: &ArtifactManifest,
    kube_version: &str,
    arch: &str,
) -> Result<BatchOutcome, FetchError> {
    let plan = artifact_plan(cfg, manifest, kube_version, arch)?;
    Ok(engine.acquire_batch(arch, plan, None)?)
}
