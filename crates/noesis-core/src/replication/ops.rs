//! Replicated operation records and the transport seam
//!
//! Mutations routed through the replicator are journaled as pending ops,
//! each tagged with the version vector observed at mutation time, the
//! originating member, and a timestamp. A sync drains the journal into a
//! [`SyncPayload`] handed to the [`Transport`]. Link ops carry the full
//! outgoing uuid list so a peer can reconstruct the edge, not merely count
//! it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::atom::types::TruthValue;
use crate::replication::version::VersionVector;

// ============================================================================
// OPERATION RECORDS
// ============================================================================

/// One replicated mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ReplicatedOp {
    /// A node came into being (or was upserted) at the origin.
    #[serde(rename_all = "camelCase")]
    AddNode {
        id: Uuid,
        atom_type: String,
        name: String,
        truth: TruthValue,
        attention: f64,
        metadata: BTreeMap<String, Value>,
    },
    /// A link came into being at the origin. `outgoing` is the full,
    /// ordered uuid list of the origin's resolved outgoing set.
    #[serde(rename_all = "camelCase")]
    AddLink {
        id: Uuid,
        link_type: String,
        outgoing: Vec<Uuid>,
        truth: TruthValue,
        attention: f64,
        metadata: BTreeMap<String, Value>,
    },
    /// An atom's attention was set explicitly at the origin.
    #[serde(rename_all = "camelCase")]
    SetAttention { id: Uuid, attention: f64 },
}

impl ReplicatedOp {
    /// The atom this op concerns.
    pub fn atom_id(&self) -> Uuid {
        match self {
            ReplicatedOp::AddNode { id, .. }
            | ReplicatedOp::AddLink { id, .. }
            | ReplicatedOp::SetAttention { id, .. } => *id,
        }
    }
}

/// A journaled mutation awaiting sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOp {
    /// The mutation itself
    pub op: ReplicatedOp,
    /// Version vector of the atom as observed at mutation time
    pub version: VersionVector,
    /// Originating cluster member
    pub origin: String,
    /// When the mutation happened at the origin
    pub timestamp: DateTime<Utc>,
}

/// Everything a peer needs to catch up: the drained op journal plus a
/// snapshot of per-atom version vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    /// Sending cluster member
    pub origin: String,
    /// Drained pending ops, in local mutation order
    pub ops: Vec<PendingOp>,
    /// Per-atom version vectors at drain time
    pub versions: BTreeMap<Uuid, VersionVector>,
    /// When the payload was assembled
    pub timestamp: DateTime<Utc>,
}

/// Receipt returned by a peer for a delivered payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Acknowledging member
    pub node_id: String,
    /// How many ops the member took delivery of
    pub received_ops: usize,
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Transport failures. Delivery problems are per-peer and never fatal to
/// the sync as a whole.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer could not be reached
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    /// The peer refused the payload
    #[error("peer rejected payload: {0}")]
    Rejected(String),
}

/// Delivery of sync payloads to peers. The wire encoding is the
/// transport's business; the replicator only specifies the payload.
pub trait Transport: Send + Sync {
    /// Deliver a payload to the named peer.
    fn send(&self, node_id: &str, payload: &SyncPayload) -> Result<Ack, TransportError>;
}

/// Transport that acknowledges everything and delivers nowhere. The
/// default for single-member clusters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, node_id: &str, payload: &SyncPayload) -> Result<Ack, TransportError> {
        Ok(Ack {
            node_id: node_id.to_string(),
            received_ops: payload.ops.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_atom_id() {
        let id = Uuid::new_v4();
        let op = ReplicatedOp::SetAttention { id, attention: 0.5 };
        assert_eq!(op.atom_id(), id);
    }

    #[test]
    fn test_payload_round_trips_through_json() {
        let id = Uuid::new_v4();
        let mut version = VersionVector::new();
        version.bump("alpha");

        let payload = SyncPayload {
            origin: "alpha".to_string(),
            ops: vec![PendingOp {
                op: ReplicatedOp::AddNode {
                    id,
                    atom_type: "ConceptNode".to_string(),
                    name: "cat".to_string(),
                    truth: TruthValue::new(0.8, 0.9),
                    attention: 0.7,
                    metadata: BTreeMap::new(),
                },
                version: version.clone(),
                origin: "alpha".to_string(),
                timestamp: Utc::now(),
            }],
            versions: BTreeMap::from([(id, version)]),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&payload).unwrap();
        let back: SyncPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ops.len(), 1);
        assert_eq!(back.ops[0].op.atom_id(), id);
    }

    #[test]
    fn test_null_transport_acks() {
        let payload = SyncPayload {
            origin: "alpha".to_string(),
            ops: vec![],
            versions: BTreeMap::new(),
            timestamp: Utc::now(),
        };
        let ack = NullTransport.send("beta", &payload).unwrap();
        assert_eq!(ack.node_id, "beta");
        assert_eq!(ack.received_ops, 0);
    }
}
