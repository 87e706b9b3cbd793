//! Per-atom version vectors
//!
//! Each replicated atom carries a map from cluster-member id to a
//! monotonically non-decreasing counter. A local mutation bumps the local
//! member's slot; merging with a remote vector takes the pointwise max.
//! A remote update wins iff its counter on its own slot exceeds the local
//! counter for that slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A version vector: cluster-member id -> monotonic counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionVector(BTreeMap<String, u64>);

impl VersionVector {
    /// An empty vector (all slots implicitly zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter for a member, zero when unseen.
    pub fn get(&self, node_id: &str) -> u64 {
        self.0.get(node_id).copied().unwrap_or(0)
    }

    /// Increment a member's slot, returning the new counter.
    pub fn bump(&mut self, node_id: &str) -> u64 {
        let slot = self.0.entry(node_id.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Pointwise max with another vector.
    pub fn merge(&mut self, other: &VersionVector) {
        for (node_id, &counter) in &other.0 {
            let slot = self.0.entry(node_id.clone()).or_insert(0);
            if counter > *slot {
                *slot = counter;
            }
        }
    }

    /// Iterate `(member, counter)` pairs in member order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Whether no slot has ever been bumped.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
