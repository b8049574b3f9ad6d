//! Keyed store of resolved artifact sets, read by later pipeline stages.
//!
//! The registry is created by the surrounding pipeline and passed by reference;
//! the acquisition engine writes one entry per successful batch.

use crate::artifact::ArtifactDescriptor;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Namespace prefix for binary sets; the full key is `kube-binaries-<arch>`.
pub const KUBE_BINARIES: &str = "kube-binaries";

/// Resolved descriptors keyed by artifact id.
pub type BinarySet = BTreeMap<String, ArtifactDescriptor>;

#[derive(Debug, Default)]
pub struct ResultRegistry {
    entries: RwLock<HashMap<String, Arc<BinarySet>>>,
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binaries_key(arch: &str) -> String {
        format!("{}-{}", KUBE_BINARIES, arch)
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: BinarySet) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(value));
    }

    pub fn get(&self, key: &str) -> Option<Arc<BinarySet>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn set_binaries(&self, arch: &str, value: BinarySet) {
        self.set(Self::binaries_key(arch), value);
    }

    pub fn binaries(&self, arch: &str) -> Option<Arc<BinarySet>> {
        self.get(&Self::binaries_key(arch))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
