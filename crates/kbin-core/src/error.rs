//! Error types for descriptor construction, integrity checks and batch acquisition.

use crate::artifact::Identity;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Building a descriptor for an artifact id with no known naming convention.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no naming convention for artifact {id:?}")]
    UnknownArtifact { id: String },
}

/// A local file did not match its reference checksum, or could not be read.
/// The engine recovers from this by deleting the file and downloading again.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("checksum mismatch for {identity}: expected {expected}, got {actual}")]
    Mismatch {
        identity: Identity,
        expected: String,
        actual: String,
    },
    #[error("read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure reported by a download executor, with whatever diagnostic output
/// the transport produced (command stdout/stderr, HTTP status, ...).
#[derive(Debug)]
pub struct DownloadFailure {
    pub message: String,
    pub output: Option<String>,
}

impl DownloadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: None,
        }
    }

    pub fn with_output(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: Some(output.into()),
        }
    }
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(output) = self.output.as_deref().map(str::trim) {
            if !output.is_empty() {
                write!(f, ": {}", output)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DownloadFailure {}

/// Fatal errors that abort a whole batch. Nothing is written to the result
/// registry once one of these is returned.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("create base dir {} for {id} failed", .path.display())]
    DirectoryCreation {
        id: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to download {id} {version} ({command})")]
    Download {
        id: String,
        version: String,
        command: String,
        #[source]
        source: DownloadFailure,
    },

    #[error("{id} {version} failed verification after download")]
    Integrity {
        id: String,
        version: String,
        #[source]
        source: IntegrityError,
    },

    #[error("{id} is built for {found} but the batch is for {expected}")]
    ArchMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("failed to download legacy helm2 binary ({command})")]
    LegacyDownload {
        command: String,
        #[source]
        source: DownloadFailure,
    },
}

/// Error from building a binary plan or running it through the engine.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_failure_display_includes_output() {
        let e = DownloadFailure::with_output("exit status 22", "curl: (22) 404 Not Found\n");
        assert_eq!(e.to_string(), "exit status 22: curl: (22) 404 Not Found");
    }

    #[test]
    fn download_failure_display_skips_blank_output() {
        let e = DownloadFailure::with_output("exit status 1", "   \n");
        assert_eq!(e.to_string(), "exit status 1");
        assert_eq!(DownloadFailure::new("boom").to_string(), "boom");
    }

    #[test]
    fn acquisition_error_names_artifact_and_command() {
        let e = AcquisitionError::Download {
            id: "kubeadm".to_string(),
            version: "v1.21.5".to_string(),
            command: "curl -L -o /tmp/kubeadm https://example.com/kubeadm".to_string(),
            source: DownloadFailure::new("exit status 6"),
        };
        let msg = e.to_string();
        assert!(msg.contains("kubeadm v1.21.5"));
        assert!(msg.contains("curl -L -o /tmp/kubeadm"));
        let source = std::error::Error::source(&e).unwrap();
        assert_eq!(source.to_string(), "exit status 6");
    }
}
