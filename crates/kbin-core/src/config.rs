use crate::artifact::SourceZone;
use crate::checksum::ChecksumTable;
use crate::executor::DEFAULT_DOWNLOAD_COMMAND;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Versions used when the caller does not pin one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultVersions {
    pub etcd: String,
    pub cni: String,
    pub helm: String,
    pub docker: String,
    pub crictl: String,
}

impl Default for DefaultVersions {
    fn default() -> Self {
        Self {
            etcd: "v3.4.13".to_string(),
            cni: "v0.9.1".to_string(),
            helm: "v3.6.3".to_string(),
            docker: "20.10.8".to_string(),
            crictl: "v1.22.0".to_string(),
        }
    }
}

/// Timeouts for the curl executor, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurlConfig {
    pub connect_timeout_secs: u64,
    pub low_speed_time_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CurlConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
        }
    }
}

/// Download transport: libcurl in-process (default) or a shell command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Curl,
    Command,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("kubekey")
}

fn default_download_command() -> String {
    DEFAULT_DOWNLOAD_COMMAND.to_string()
}

/// Global configuration loaded from `~/.config/kbin/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbinConfig {
    /// Root directory for downloaded binaries.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Mirror family for source URLs: "default" or "cn".
    #[serde(default)]
    pub zone: SourceZone,
    /// Download transport: "curl" (default) or "command".
    #[serde(default)]
    pub executor: ExecutorKind,
    /// Shell template for the command executor; `{dest}` and `{url}` are substituted.
    #[serde(default = "default_download_command")]
    pub download_command: String,
    /// Optional checksum table file, merged under the inline `[checksums]` table.
    #[serde(default)]
    pub checksums_file: Option<PathBuf>,
    #[serde(default)]
    pub defaults: DefaultVersions,
    #[serde(default)]
    pub curl: CurlConfig,
    /// Inline reference checksums: `id -> arch -> version -> sha256`.
    #[serde(default)]
    pub checksums: ChecksumTable,
}

impl Default for KbinConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            zone: SourceZone::default(),
            executor: ExecutorKind::default(),
            download_command: default_download_command(),
            checksums_file: None,
            defaults: DefaultVersions::default(),
            curl: CurlConfig::default(),
            checksums: ChecksumTable::default(),
        }
    }
}

impl KbinConfig {
    /// Reference checksums from `checksums_file` (if any) overlaid with the inline table.
    pub fn checksum_table(&self) -> Result<ChecksumTable> {
        let mut table = match &self.checksums_file {
            Some(path) => ChecksumTable::load(path)?,
            None => ChecksumTable::new(),
        };
        table.merge(self.checksums.clone());
        Ok(table)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kbin")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KbinConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KbinConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path; the file must exist.
pub fn load_from(path: &Path) -> Result<KbinConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: KbinConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
