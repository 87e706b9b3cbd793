//! # Replication Layer
//!
//! Wraps the [`AtomStore`](crate::atom::AtomStore) with per-atom version
//! vectors, a pending-op journal, and a sync/apply protocol. Consistency
//! is eventual with last-writer-wins on per-member version counters; there
//! is no consensus and no rebalancing - membership changes only update the
//! peer map and later syncs carry the state.
//!
//! The network is abstracted behind the [`Transport`] trait so tests can
//! inject deterministic peers and fault injection.

pub mod ops;
pub mod replicator;
pub mod version;

pub use ops::{Ack, NullTransport, PendingOp, ReplicatedOp, SyncPayload, Transport, TransportError};
pub use replicator::{
    AppliedBatch, ConsistencyLevel, PeerInfo, ReplicationStats, Replicator, SyncOutcome,
};
pub use version::VersionVector;
