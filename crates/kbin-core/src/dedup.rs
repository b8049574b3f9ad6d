//! Collapse descriptors that resolve to the same identity.

use crate::artifact::ArtifactDescriptor;
use std::collections::HashSet;

/// Keeps the first descriptor seen for each identity, preserving input order.
pub fn dedup_by_identity<I>(candidates: I) -> Vec<ArtifactDescriptor>
where
    I: IntoIterator<Item = ArtifactDescriptor>,
{
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|d| seen.insert(d.identity()))
        .collect()
}
