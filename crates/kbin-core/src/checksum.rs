//! SHA-256 integrity checks against a reference table.
//!
//! The reference table maps `id -> arch -> version -> sha256` and is loaded
//! from configuration. Artifacts without an entry are not checksum-gated; the
//! checker reports them as [`Verification::Unknown`] and logs a warning.

use crate::artifact::{ArtifactDescriptor, Identity};
use crate::error::IntegrityError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Like [`sha256_file`] with the path attached to the error.
pub fn sha256_path(path: &Path) -> Result<String> {
    sha256_file(path).with_context(|| format!("hash {}", path.display()))
}

/// Known-good checksums keyed by identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumTable(BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>);

impl ChecksumTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identity: &Identity, sha256: impl Into<String>) {
        self.0
            .entry(identity.id.clone())
            .or_default()
            .entry(identity.arch.clone())
            .or_default()
            .insert(identity.version.clone(), sha256.into());
    }

    pub fn lookup(&self, identity: &Identity) -> Option<&str> {
        self.0
            .get(&identity.id)?
            .get(&identity.arch)?
            .get(&identity.version)
            .map(String::as_str)
    }

    /// Adds every entry of `other`; entries in `other` win on conflict.
    pub fn merge(&mut self, other: ChecksumTable) {
        for (id, arches) in other.0 {
            let by_arch = self.0.entry(id).or_default();
            for (arch, versions) in arches {
                by_arch.entry(arch).or_default().extend(versions);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(|arches| arches.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        toml::from_str(data).context("parse checksum table")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("load {}", path.display()))
    }
}

/// Outcome of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Digest matched the reference.
    Verified,
    /// No reference entry; the file was not hashed.
    Unknown,
}

/// Verifies local files against a [`ChecksumTable`]. Never touches the filesystem
/// beyond reading.
#[derive(Debug, Clone, Default)]
pub struct IntegrityChecker {
    table: ChecksumTable,
}

impl IntegrityChecker {
    pub fn new(table: ChecksumTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ChecksumTable {
        &self.table
    }

    pub fn verify(&self, descriptor: &ArtifactDescriptor) -> Result<Verification, IntegrityError> {
        let identity = descriptor.identity();
        let Some(expected) = self.table.lookup(&identity) else {
            tracing::warn!(
                "no reference checksum for {}, skipping integrity check",
                identity
            );
            return Ok(Verification::Unknown);
        };

        let path = descriptor.path();
        let actual =
            sha256_file(&path).map_err(|source| IntegrityError::Read { path, source })?;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(Verification::Verified)
        } else {
            Err(IntegrityError::Mismatch {
                identity,
                expected: expected.to_string(),
                actual,
            })
        }
    }
}
