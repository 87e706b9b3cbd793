//! Kernel configuration
//!
//! One record carries everything tunable at construction: cluster
//! identity, replication cadence, scheduling policy and quantum, store
//! capacity and decay, and working-memory bounds. Collaborator handles
//! (transport, clock, random, personality) are passed separately so the
//! config stays plain data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::sched::SchedPolicy;
use noesis_core::{DEFAULT_ATOM_CAPACITY, DEFAULT_DECAY_RATE};

/// Construction-time kernel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KernelConfig {
    /// This kernel's cluster-member identity
    pub node_id: String,
    /// Peer map: member id -> transport address
    pub peers: BTreeMap<String, String>,
    /// Minimum wall-clock gap between syncs
    pub sync_interval: Duration,
    /// Scheduling policy
    pub policy: SchedPolicy,
    /// Cooperative time quantum
    pub time_quantum: Duration,
    /// Maximum atoms the store will hold
    pub atom_capacity: usize,
    /// Per-pass attention decay rate (0.99 and 0.995 are both in service)
    pub attention_decay_rate: f64,
    /// Working-memory entries per process
    pub working_memory_capacity: usize,
    /// Working-memory retention window
    pub working_memory_retention: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            node_id: "local".to_string(),
            peers: BTreeMap::new(),
            sync_interval: Duration::from_secs(5),
            policy: SchedPolicy::ConsciousnessAware,
            time_quantum: Duration::from_millis(100),
            atom_capacity: DEFAULT_ATOM_CAPACITY,
            attention_decay_rate: DEFAULT_DECAY_RATE,
            working_memory_capacity: crate::process::DEFAULT_WORKING_MEMORY_CAPACITY,
            working_memory_retention: Duration::from_secs(
                crate::process::DEFAULT_WORKING_MEMORY_RETENTION_SECS as u64,
            ),
        }
    }
}

impl KernelConfig {
    /// Default config under a given cluster identity.
    pub fn for_node(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    /// Set the scheduling policy.
    pub fn with_policy(mut self, policy: SchedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the cooperative time quantum.
    pub fn with_time_quantum(mut self, quantum: Duration) -> Self {
        self.time_quantum = quantum;
        self
    }

    /// Set the sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Register a peer.
    pub fn with_peer(mut self, node_id: impl Into<String>, address: impl Into<String>) -> Self {
        self.peers.insert(node_id.into(), address.into());
        self
    }

    /// Set the attention decay rate.
    pub fn with_attention_decay_rate(mut self, rate: f64) -> Self {
        self.attention_decay_rate = rate;
        self
    }
}
