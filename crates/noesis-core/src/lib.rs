//! # Noesis Core
//!
//! The hypergraph memory engine of the Noesis cognitive kernel:
//!
//! - **Atoms**: named Nodes and structured Links, each with a truth value
//!   `(strength, confidence)`, an attention value in `[0, 1]`, and opaque
//!   metadata. The [`AtomStore`] is the single owner; everything outside
//!   holds uuids.
//! - **Attention dynamics**: spreading along link structure, per-pass
//!   decay, and attention-ranked retrieval.
//! - **Pattern queries**: declarative matching with `?variable` binding
//!   over names and positional link outgoing sets.
//! - **Replication**: per-atom version vectors, a pending-op journal, and
//!   an eventually consistent sync/apply protocol behind an injectable
//!   [`Transport`].
//! - **Collaborator seams**: [`Clock`] and [`Random`] traits so every
//!   time- and chance-dependent decision is deterministic under test.
//!
//! ## Quick Start
//!
//! ```rust
//! use noesis_core::{AtomStore, Pattern, TruthValue};
//!
//! let mut store = AtomStore::new();
//! store.add_node("ConceptNode", "cat", Some(TruthValue::new(0.9, 0.8)), Some(0.7), None)?;
//! store.add_link("InheritanceLink", &["cat".into(), "animal".into()], None, None, None)?;
//!
//! let matches = store.query(&Pattern::link("InheritanceLink", vec!["?x", "animal"]));
//! assert_eq!(matches[0].bindings["x"], "cat");
//! # Ok::<(), noesis_core::StoreError>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod atom;
pub mod clock;
pub mod random;
pub mod replication;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Atoms and queries
pub use atom::{
    is_variable, variable_name, Atom, AtomKind, AtomStore, Bindings, OutgoingSpec, Pattern,
    QueryMatch, StoreError, StoreStats, TruthValue, DEFAULT_ATOM_CAPACITY, DEFAULT_ATTENTION,
    DEFAULT_DECAY_RATE,
};

// Replication
pub use replication::{
    Ack, AppliedBatch, ConsistencyLevel, NullTransport, PeerInfo, PendingOp, ReplicatedOp,
    ReplicationStats, Replicator, SyncOutcome, SyncPayload, Transport, TransportError,
    VersionVector,
};

// Collaborators
pub use clock::{Clock, ManualClock, SystemClock};
pub use random::{Random, SeededRandom, ThreadRandom};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Atom, AtomKind, AtomStore, Bindings, Clock, OutgoingSpec, Pattern, QueryMatch, Random,
        Replicator, StoreError, StoreStats, SyncOutcome, Transport, TruthValue, VersionVector,
    };
}
