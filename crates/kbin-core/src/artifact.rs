//! Artifact descriptors: what to fetch, where it lives, and where it comes from.
//!
//! A descriptor is built once per run from configuration and never edited.
//! Its on-disk location is `<root>/<group>/<version>/<arch>/<file_name>`.

use crate::error::{AcquisitionError, PlanError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Which family of mirrors the source URLs point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceZone {
    #[default]
    Default,
    Cn,
}

/// The (id, arch, version) tuple used for deduplication and checksum lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub arch: String,
    pub version: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, arch: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            arch: arch.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.id, self.version, self.arch)
    }
}

/// One binary to obtain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    id: String,
    arch: String,
    version: String,
    base_dir: PathBuf,
    file_name: String,
    source_url: String,
}

impl ArtifactDescriptor {
    /// Builds the descriptor for a known artifact id under `root`.
    pub fn new(
        id: &str,
        arch: &str,
        version: &str,
        root: &Path,
        zone: SourceZone,
    ) -> Result<Self, PlanError> {
        let layout = layout(id, arch, version, zone).ok_or_else(|| PlanError::UnknownArtifact {
            id: id.to_string(),
        })?;
        Ok(Self {
            id: id.to_string(),
            arch: arch.to_string(),
            version: version.to_string(),
            base_dir: root.join(layout.group).join(version).join(arch),
            file_name: layout.file_name,
            source_url: layout.url,
        })
    }

    /// Descriptor with an explicit location and source, for artifacts outside
    /// the built-in naming conventions.
    pub fn with_source(
        identity: Identity,
        base_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: identity.id,
            arch: identity.arch,
            version: identity.version,
            base_dir: base_dir.into(),
            file_name: file_name.into(),
            source_url: source_url.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn identity(&self) -> Identity {
        Identity::new(&self.id, &self.arch, &self.version)
    }

    /// Full path of the binary on disk.
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.file_name)
    }

    /// Creates the base directory hierarchy if it is missing.
    pub fn ensure_base_dir(&self) -> Result<(), AcquisitionError> {
        fs::create_dir_all(&self.base_dir).map_err(|source| AcquisitionError::DirectoryCreation {
            id: self.id.clone(),
            path: self.base_dir.clone(),
            source,
        })
    }
}

struct Layout {
    group: &'static str,
    file_name: String,
    url: String,
}

/// Docker publishes static bundles under the kernel-style machine name.
fn docker_arch(arch: &str) -> &str {
    match arch {
        "amd64" => "x86_64",
        "arm64" => "aarch64",
        other => other,
    }
}

fn layout(id: &str, arch: &str, version: &str, zone: SourceZone) -> Option<Layout> {
    let cn = zone == SourceZone::Cn;
    let (group, file_name, url) = match id {
        "kubeadm" | "kubelet" | "kubectl" => {
            let host = if cn {
                "https://kubernetes-release.pek3b.qingstor.com/release"
            } else {
                "https://storage.googleapis.com/kubernetes-release/release"
            };
            let url = format!("{}/{}/bin/linux/{}/{}", host, version, arch, id);
            ("kube", id.to_string(), url)
        }
        "etcd" => {
            let file = format!("etcd-{}-linux-{}.tar.gz", version, arch);
            let host = if cn {
                "https://kubernetes-release.pek3b.qingstor.com/etcd/release/download"
            } else {
                "https://github.com/coreos/etcd/releases/download"
            };
            let url = format!("{}/{}/{}", host, version, file);
            ("etcd", file, url)
        }
        "kubecni" => {
            let file = format!("cni-plugins-linux-{}-{}.tgz", arch, version);
            let host = if cn {
                "https://containernetworking.pek3b.qingstor.com/plugins/releases/download"
            } else {
                "https://github.com/containernetworking/plugins/releases/download"
            };
            let url = format!("{}/{}/{}", host, version, file);
            ("cni", file, url)
        }
        "helm" => {
            // The cn mirror serves the bare client; get.helm.sh only the tarball.
            if cn {
                let url = format!(
                    "https://kubernetes-helm.pek3b.qingstor.com/linux-{}/{}/helm",
                    arch, version
                );
                ("helm", "helm".to_string(), url)
            } else {
                let file = format!("helm-{}-linux-{}.tar.gz", version, arch);
                ("helm", file.clone(), format!("https://get.helm.sh/{}", file))
            }
        }
        "docker" => {
            let file = format!("docker-{}.tgz", version);
            let host = if cn {
                "https://mirrors.aliyun.com/docker-ce/linux/static/stable"
            } else {
                "https://download.docker.com/linux/static/stable"
            };
            let url = format!("{}/{}/{}", host, docker_arch(arch), file);
            ("docker", file, url)
        }
        "crictl" => {
            let file = format!("crictl-{}-linux-{}.tar.gz", version, arch);
            let host = if cn {
                "https://kubernetes-release.pek3b.qingstor.com/cri-tools/releases/download"
            } else {
                "https://github.com/kubernetes-sigs/cri-tools/releases/download"
            };
            let url = format!("{}/{}/{}", host, version, file);
            ("crictl", file, url)
        }
        _ => return None,
    };
    Some(Layout {
        group,
        file_name,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kube_binaries_share_group_dir() {
        let root = Path::new("/srv/kubekey");
        let d = ArtifactDescriptor::new("kubeadm", "amd64", "v1.21.5", root, SourceZone::Default)
            .unwrap();
        assert_eq!(d.base_dir(), Path::new("/srv/kubekey/kube/v1.21.5/amd64"));
        assert_eq!(d.path(), PathBuf::from("/srv/kubekey/kube/v1.21.5/amd64/kubeadm"));
        assert_eq!(
            d.source_url(),
            "https://storage.googleapis.com/kubernetes-release/release/v1.21.5/bin/linux/amd64/kubeadm"
        );
    }

    #[test]
    fn cni_and_etcd_file_names() {
        let root = Path::new("/k");
        let cni =
            ArtifactDescriptor::new("kubecni", "arm64", "v0.9.1", root, SourceZone::Default).unwrap();
        assert_eq!(cni.path(), PathBuf::from("/k/cni/v0.9.1/arm64/cni-plugins-linux-arm64-v0.9.1.tgz"));

        let etcd =
            ArtifactDescriptor::new("etcd", "amd64", "v3.4.13", root, SourceZone::Cn).unwrap();
        assert_eq!(etcd.file_name(), "etcd-v3.4.13-linux-amd64.tar.gz");
        assert!(etcd
            .source_url()
            .starts_with("https://kubernetes-release.pek3b.qingstor.com/etcd/"));
    }

    #[test]
    fn docker_uses_machine_arch_in_url() {
        let d = ArtifactDescriptor::new("docker", "arm64", "20.10.8", Path::new("/k"), SourceZone::Default)
            .unwrap();
        assert_eq!(
            d.source_url(),
            "https://download.docker.com/linux/static/stable/aarch64/docker-20.10.8.tgz"
        );
        assert_eq!(d.base_dir(), Path::new("/k/docker/20.10.8/arm64"));
    }

    #[test]
    fn unknown_id_is_rejected() {
        let err = ArtifactDescriptor::new("podman", "amd64", "4.0", Path::new("/k"), SourceZone::Default)
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownArtifact { id } if id == "podman"));
    }

    #[test]
    fn identity_ignores_location() {
        let a = ArtifactDescriptor::new("helm", "amd64", "v3.6.3", Path::new("/a"), SourceZone::Default)
            .unwrap();
        let b = ArtifactDescriptor::new("helm", "amd64", "v3.6.3", Path::new("/b"), SourceZone::Cn)
            .unwrap();
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity().to_string(), "helm v3.6.3 (amd64)");
    }

    #[test]
    fn helm_file_name_follows_zone_payload() {
        let root = Path::new("/k");
        let tarball =
            ArtifactDescriptor::new("helm", "arm64", "v3.6.3", root, SourceZone::Default).unwrap();
        assert_eq!(tarball.file_name(), "helm-v3.6.3-linux-arm64.tar.gz");
        assert_eq!(
            tarball.source_url(),
            "https://get.helm.sh/helm-v3.6.3-linux-arm64.tar.gz"
        );
        assert_eq!(
            tarball.path(),
            PathBuf::from("/k/helm/v3.6.3/arm64/helm-v3.6.3-linux-arm64.tar.gz")
        );

        let client = ArtifactDescriptor::new("helm", "arm64", "v3.6.3", root, SourceZone::Cn).unwrap();
        assert_eq!(client.file_name(), "helm");
        assert_eq!(
            client.source_url(),
            "https://kubernetes-helm.pek3b.qingstor.com/linux-arm64/v3.6.3/helm"
        );
        assert_eq!(client.base_dir(), tarball.base_dir());
        assert_ne!(client.path(), tarball.path());
    }

    #[test]
    fn ensure_base_dir_creates_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let d = ArtifactDescriptor::new("crictl", "amd64", "v1.22.0", dir.path(), SourceZone::Default)
            .unwrap();
        d.ensure_base_dir().unwrap();
        assert!(d.base_dir().is_dir());
        // Idempotent.
        d.ensure_base_dir().unwrap();
    }

    #[test]
    fn ensure_base_dir_reports_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let d = ArtifactDescriptor::new("etcd", "amd64", "v3.4.13", &blocker, SourceZone::Default)
            .unwrap();
        match d.ensure_base_dir().unwrap_err() {
            AcquisitionError::DirectoryCreation { id, path, .. } => {
                assert_eq!(id, "etcd");
                assert_eq!(path, blocker.join("etcd/v3.4.13/amd64"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
