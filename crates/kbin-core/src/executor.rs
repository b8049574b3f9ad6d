//! Download executors: the only place kbin touches the network.
//!
//! The acquisition engine only depends on [`DownloadExecutor`]. Two transports
//! ship with kbin: a libcurl GET ([`CurlExecutor`]) and a shell command template
//! ([`CommandExecutor`]) for hosts that must go through `curl`/`wget` with
//! site-specific flags.

use crate::config::{ExecutorKind, KbinConfig};
use crate::error::DownloadFailure;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

/// Default shell template; `{dest}` and `{url}` are substituted verbatim.
pub const DEFAULT_DOWNLOAD_COMMAND: &str = "curl -L -o {dest} {url}";

/// Transfers `url` to `dest`. Implementations must leave no partial file at
/// `dest` when they report failure, or overwrite it on the next success.
pub trait DownloadExecutor {
    fn download(&self, dest: &Path, url: &str) -> Result<(), DownloadFailure>;

    /// Human-readable form of the action, used in error messages.
    fn describe(&self, dest: &Path, url: &str) -> String {
        format!("GET {} -> {}", url, dest.display())
    }
}

/// Builds the executor selected in configuration.
pub fn from_config(cfg: &KbinConfig) -> Box<dyn DownloadExecutor> {
    match cfg.executor {
        ExecutorKind::Curl => Box::new(CurlExecutor::new(CurlOptions {
            connect_timeout: Duration::from_secs(cfg.curl.connect_timeout_secs),
            low_speed_time: Duration::from_secs(cfg.curl.low_speed_time_secs),
            timeout: Duration::from_secs(cfg.curl.timeout_secs),
        })),
        ExecutorKind::Command => Box::new(CommandExecutor::new(cfg.download_command.clone())),
    }
}

/// Timeouts applied to each transfer.
#[derive(Debug, Clone, Copy)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays under 1 KiB/s for this long.
    pub low_speed_time: Duration,
    pub timeout: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Single GET via libcurl, following redirects. The body goes to a temp file in
/// the destination directory and is renamed over `dest` only on success.
#[derive(Debug, Clone, Default)]
pub struct CurlExecutor {
    opts: CurlOptions,
}

fn curl_failure(e: curl::Error) -> DownloadFailure {
    DownloadFailure::new(format!("curl: {}", e))
}

impl CurlExecutor {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }

    fn fetch_into(&self, url: &str, check_status: bool, file: &mut File) -> Result<(), DownloadFailure> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_failure)?;
        easy.follow_location(true).map_err(curl_failure)?;
        easy.max_redirections(10).map_err(curl_failure)?;
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(curl_failure)?;
        easy.low_speed_limit(1024).map_err(curl_failure)?;
        easy.low_speed_time(self.opts.low_speed_time)
            .map_err(curl_failure)?;
        easy.timeout(self.opts.timeout).map_err(curl_failure)?;

        let mut write_err = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match file.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(curl_failure)?;
            transfer.perform()
        };
        if let Some(e) = write_err {
            return Err(DownloadFailure::new(format!("write body: {}", e)));
        }
        performed.map_err(|e| DownloadFailure::new(format!("GET {} failed: {}", url, e)))?;

        if check_status {
            let code = easy.response_code().map_err(curl_failure)?;
            if !(200..300).contains(&code) {
                return Err(DownloadFailure::new(format!("GET {} returned HTTP {}", url, code)));
            }
        }
        file.flush()
            .map_err(|e| DownloadFailure::new(format!("flush body: {}", e)))
    }
}

impl DownloadExecutor for CurlExecutor {
    fn download(&self, dest: &Path, url: &str) -> Result<(), DownloadFailure> {
        let parsed = url::Url::parse(url)
            .map_err(|e| DownloadFailure::new(format!("invalid URL {}: {}", url, e)))?;
        let check_status = matches!(parsed.scheme(), "http" | "https");

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".kbin-")
            .tempfile_in(dir)
            .map_err(|e| {
                DownloadFailure::new(format!("create temp file in {}: {}", dir.display(), e))
            })?;

        self.fetch_into(url, check_status, tmp.as_file_mut())?;

        // Temp files are created 0600; cached binaries must match what
        // `curl -o` leaves behind.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(|e| DownloadFailure::new(format!("chmod {}: {}", dest.display(), e)))?;
        }

        tmp.persist(dest).map_err(|e| {
            DownloadFailure::new(format!("persist {}: {}", dest.display(), e.error))
        })?;
        tracing::debug!("fetched {} -> {}", url, dest.display());
        Ok(())
    }
}

/// Runs a user-supplied shell command such as `curl -L -o {dest} {url}`.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    template: String,
}

impl CommandExecutor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, dest: &Path, url: &str) -> String {
        self.template
            .replace("{dest}", &dest.display().to_string())
            .replace("{url}", url)
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_COMMAND)
    }
}

impl DownloadExecutor for CommandExecutor {
    fn download(&self, dest: &Path, url: &str) -> Result<(), DownloadFailure> {
        let cmd = self.render(dest, url);
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(&cmd)
            .output()
            .map_err(|e| DownloadFailure::new(format!("spawn /bin/sh: {}", e)))?;
        if output.status.success() {
            return Ok(());
        }
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        tracing::error!("{}", combined.trim_end());
        Err(DownloadFailure::with_output(
            format!("command exited with {}", output.status),
            combined,
        ))
    }

    fn describe(&self, dest: &Path, url: &str) -> String {
        self.render(dest, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_template_substitution() {
        let exec = CommandExecutor::new("wget -q -O {dest} {url}");
        assert_eq!(
            exec.render(Path::new("/k/helm/v3.6.3/amd64/helm"), "https://example.com/helm"),
            "wget -q -O /k/helm/v3.6.3/amd64/helm https://example.com/helm"
        );
        assert_eq!(
            exec.describe(Path::new("/d"), "u"),
            exec.render(Path::new("/d"), "u")
        );
    }

    #[test]
    fn default_describe_names_url_and_dest() {
        let exec = CurlExecutor::default();
        assert_eq!(
            exec.describe(Path::new("/k/etcd"), "https://example.com/etcd"),
            "GET https://example.com/etcd -> /k/etcd"
        );
    }

    #[test]
    fn command_executor_success_writes_dest() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let exec = CommandExecutor::new("printf %s {url} > {dest}");
        exec.download(&dest, "payload").unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "payload");
    }

    #[test]
    fn command_executor_failure_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let exec = CommandExecutor::new("echo no route to {url} >&2; exit 7");
        let err = exec.download(&dir.path().join("x"), "mirror").unwrap_err();
        assert!(err.message.contains("exit"));
        assert_eq!(err.output.as_deref().map(str::trim), Some("no route to mirror"));
    }

    #[test]
    fn curl_executor_rejects_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bin");
        let err = CurlExecutor::default().download(&dest, "not a url").unwrap_err();
        assert!(err.message.starts_with("invalid URL"));
        assert!(!dest.exists());
    }

    #[test]
    fn curl_executor_reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, b"binary").unwrap();
        let url = url::Url::from_file_path(&src).unwrap();
        let dest = dir.path().join("dest.bin");
        CurlExecutor::default().download(&dest, url.as_str()).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary");
    }

    #[test]
    fn curl_executor_leaves_no_partial_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let url = url::Url::from_file_path(dir.path().join("missing.bin")).unwrap();
        let dest = dir.path().join("dest.bin");
        assert!(CurlExecutor::default().download(&dest, url.as_str()).is_err());
        assert!(!dest.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn curl_executor_leaves_binary_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("kubectl.src");
        std::fs::write(&src, b"binary").unwrap();
        let url = url::Url::from_file_path(&src).unwrap();
        let dest = dir.path().join("kubectl");
        CurlExecutor::default().download(&dest, url.as_str()).unwrap();
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644, "mode {:o}", mode);
    }
}
