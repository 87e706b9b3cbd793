//! Replicator - versioned, eventually consistent wrapper over the store
//!
//! Every mutation routed through the replicator bumps the local member's
//! slot in the atom's version vector and journals a pending op. `sync`
//! drains the journal toward peers at most once per interval; applying a
//! remote batch replays its ops under the version-vector test, counting
//! rejected ops as conflicts. Replication is passive: membership changes
//! move no atoms, later syncs do.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::atom::store::{
    AtomStore, Result as StoreResult, RECORDER_ATTENTION, RECORDER_CONFIDENCE, RECORDER_STRENGTH,
};
use crate::atom::types::{Atom, OutgoingSpec, Pattern, QueryMatch, TruthValue};
use crate::clock::Clock;
use crate::replication::ops::{PendingOp, ReplicatedOp, SyncPayload, Transport};
use crate::replication::version::VersionVector;

// ============================================================================
// TYPES
// ============================================================================

/// Replication consistency. Only eventual consistency is implemented;
/// `Strong` is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    /// Last-writer-wins on per-member version counters
    #[default]
    Eventual,
    /// Reserved, not specified
    Strong,
}

/// What the replicator knows about a peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    /// Opaque peer address, meaningful only to the transport
    pub address: String,
    /// When this peer last acknowledged a sync
    pub last_sync: Option<DateTime<Utc>>,
}

/// Result of a sync attempt.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Called again within the sync interval; nothing was drained.
    TooSoon,
    /// The journal was drained and offered to every peer.
    Synced {
        /// The payload that was sent (ops in local mutation order)
        payload: SyncPayload,
        /// Peers that acknowledged
        peers_reached: usize,
        /// Peers that failed delivery
        peers_failed: usize,
    },
}

/// Result of applying one remote batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedBatch {
    /// Ops applied
    pub applied: usize,
    /// Ops rejected by the version-vector test or unresolvable references
    pub conflicts: usize,
}

/// Counters for observability. Conflicts are silent by design - they are
/// visible only here.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationStats {
    /// Local mutations journaled
    pub local_ops: u64,
    /// Remote ops applied
    pub remote_ops_applied: u64,
    /// Remote ops rejected
    pub conflicts: u64,
    /// Syncs that drained the journal
    pub syncs_completed: u64,
    /// Syncs skipped by the interval gate
    pub syncs_skipped: u64,
}

// ============================================================================
// REPLICATOR
// ============================================================================

/// The replication layer wrapping an [`AtomStore`].
pub struct Replicator {
    node_id: String,
    store: AtomStore,
    versions: HashMap<Uuid, VersionVector>,
    pending: Vec<PendingOp>,
    peers: BTreeMap<String, PeerInfo>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    sync_interval: Duration,
    last_sync: Option<DateTime<Utc>>,
    consistency: ConsistencyLevel,
    stats: ReplicationStats,
}

impl Replicator {
    /// Wrap a store for the given cluster member.
    pub fn new(
        node_id: impl Into<String>,
        store: AtomStore,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        sync_interval: std::time::Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            store,
            versions: HashMap::new(),
            pending: Vec::new(),
            peers: BTreeMap::new(),
            transport,
            clock,
            sync_interval: Duration::from_std(sync_interval).unwrap_or(Duration::seconds(5)),
            last_sync: None,
            consistency: ConsistencyLevel::Eventual,
            stats: ReplicationStats::default(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// This member's id.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Read access to the wrapped store.
    pub fn store(&self) -> &AtomStore {
        &self.store
    }

    /// The known peers.
    pub fn peers(&self) -> &BTreeMap<String, PeerInfo> {
        &self.peers
    }

    /// Journaled ops not yet synced.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Replication counters.
    pub fn stats(&self) -> ReplicationStats {
        self.stats
    }

    /// The configured consistency level.
    pub fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }

    /// Version vector for an atom, empty when never mutated here.
    pub fn version_of(&self, id: &Uuid) -> VersionVector {
        self.versions.get(id).cloned().unwrap_or_default()
    }

    // ========================================================================
    // LOCAL MUTATION
    // ========================================================================

    /// Add (or upsert) a node, journaling the op.
    pub fn add_node(
        &mut self,
        atom_type: &str,
        name: &str,
        truth: Option<TruthValue>,
        attention: Option<f64>,
        metadata: Option<BTreeMap<String, Value>>,
    ) -> StoreResult<Uuid> {
        let id = self.store.add_node(atom_type, name, truth, attention, metadata)?;
        let atom = self.store.get(&id).expect("just added");
        let op = ReplicatedOp::AddNode {
            id,
            atom_type: atom.atom_type.clone(),
            name: name.to_string(),
            truth: atom.truth,
            attention: atom.attention,
            metadata: atom.metadata.clone(),
        };
        self.journal(id, op);
        Ok(id)
    }

    /// Add (or upsert) a link, journaling the op with its full resolved
    /// outgoing uuid list. Bare-name entries are resolved through
    /// [`Self::add_node`] first so implied nodes replicate ahead of the
    /// link that needs them.
    pub fn add_link(
        &mut self,
        link_type: &str,
        outgoing: &[OutgoingSpec],
        truth: Option<TruthValue>,
        attention: Option<f64>,
        metadata: Option<BTreeMap<String, Value>>,
    ) -> StoreResult<Uuid> {
        let mut resolved = Vec::with_capacity(outgoing.len());
        for spec in outgoing {
            match spec {
                OutgoingSpec::Id(id) => resolved.push(OutgoingSpec::Id(*id)),
                OutgoingSpec::Name(name) => {
                    let id = match self.store.get_node("ConceptNode", name) {
                        Some(atom) => atom.id,
                        None => self.add_node("ConceptNode", name, None, None, None)?,
                    };
                    resolved.push(OutgoingSpec::Id(id));
                }
            }
        }

        let id = self.store.add_link(link_type, &resolved, truth, attention, metadata)?;
        let atom = self.store.get(&id).expect("just added");
        let op = ReplicatedOp::AddLink {
            id,
            link_type: atom.atom_type.clone(),
            outgoing: atom.outgoing.clone(),
            truth: atom.truth,
            attention: atom.attention,
            metadata: atom.metadata.clone(),
        };
        self.journal(id, op);
        Ok(id)
    }

    /// Set an atom's attention, journaling the op.
    pub fn set_attention(&mut self, id: &Uuid, attention: f64) -> StoreResult<()> {
        self.store.set_attention(id, attention)?;
        let applied = self.store.get(id).expect("just set").attention;
        self.journal(*id, ReplicatedOp::SetAttention { id: *id, attention: applied });
        Ok(())
    }

    /// Set an atom's truth value. Truth mutations are local dynamics and
    /// are not journaled.
    pub fn set_truth(&mut self, id: &Uuid, truth: TruthValue) -> StoreResult<()> {
        self.store.set_truth(id, truth)
    }

    /// Spread attention from a source atom. Spreading is a local dynamic
    /// and is not journaled; each member runs its own attention economy.
    pub fn spread_attention(&mut self, source: &Uuid, factor: f64, depth: i32) -> StoreResult<()> {
        self.store.spread_attention(source, factor, depth)
    }

    /// Decay every atom's attention. Local dynamic, not journaled.
    pub fn decay_attention(&mut self) {
        self.store.decay_attention();
    }

    /// Record a failure of purposeful completion, journaling every
    /// constituent op so the evaluation replicates.
    pub fn record_entelechy_failure(&mut self, description: &str, severity: f64) -> StoreResult<Uuid> {
        let truth = TruthValue::new(RECORDER_STRENGTH, RECORDER_CONFIDENCE);
        let mut meta = BTreeMap::new();
        meta.insert("description".to_string(), Value::from(description));
        meta.insert("severity".to_string(), Value::from(severity.clamp(0.0, 1.0)));

        let failure = self.add_node(
            "ConceptNode",
            &format!("entelechy_failure_{}", self.clock.now_millis()),
            Some(truth),
            Some(RECORDER_ATTENTION),
            Some(meta),
        )?;
        let predicate = self.add_node(
            "PredicateNode",
            "EntelechyFailure",
            Some(truth),
            Some(RECORDER_ATTENTION),
            None,
        )?;
        self.add_link(
            "EvaluationLink",
            &[OutgoingSpec::Id(predicate), OutgoingSpec::Id(failure)],
            Some(truth),
            Some(RECORDER_ATTENTION),
            None,
        )?;
        Ok(failure)
    }

    /// Record a transcendent insight, journaling every constituent op.
    pub fn record_transcendence(&mut self, concept: &str, insight: &str) -> StoreResult<Uuid> {
        let truth = TruthValue::new(RECORDER_STRENGTH, RECORDER_CONFIDENCE);
        let mut meta = BTreeMap::new();
        meta.insert("insight".to_string(), Value::from(insight));

        let node = self.add_node(
            "ConceptNode",
            concept,
            Some(truth),
            Some(RECORDER_ATTENTION),
            Some(meta),
        )?;
        let anchor = self.add_node(
            "ConceptNode",
            "TranscendentInsight",
            Some(truth),
            Some(RECORDER_ATTENTION),
            None,
        )?;
        self.add_link(
            "InheritanceLink",
            &[OutgoingSpec::Id(node), OutgoingSpec::Id(anchor)],
            Some(truth),
            Some(RECORDER_ATTENTION),
            None,
        )?;
        Ok(node)
    }

    fn journal(&mut self, atom: Uuid, op: ReplicatedOp) {
        let version = self.versions.entry(atom).or_default();
        version.bump(&self.node_id);
        let snapshot = version.clone();
        self.pending.push(PendingOp {
            op,
            version: snapshot,
            origin: self.node_id.clone(),
            timestamp: self.clock.now(),
        });
        self.stats.local_ops += 1;
    }

    // ========================================================================
    // SYNC
    // ========================================================================

    /// Drain the pending journal toward every peer.
    ///
    /// Eligible at most once per sync interval of wall clock; an early
    /// call returns [`SyncOutcome::TooSoon`] and drains nothing. Per-peer
    /// delivery failures are logged and counted, never fatal.
    pub fn sync(&mut self) -> SyncOutcome {
        let now = self.clock.now();
        if let Some(last) = self.last_sync {
            if now - last < self.sync_interval {
                self.stats.syncs_skipped += 1;
                return SyncOutcome::TooSoon;
            }
        }

        let payload = SyncPayload {
            origin: self.node_id.clone(),
            ops: std::mem::take(&mut self.pending),
            versions: self
                .versions
                .iter()
                .map(|(id, vv)| (*id, vv.clone()))
                .collect(),
            timestamp: now,
        };

        let mut peers_reached = 0;
        let mut peers_failed = 0;
        for (peer_id, info) in self.peers.iter_mut() {
            match self.transport.send(peer_id, &payload) {
                Ok(ack) => {
                    debug!(peer = %peer_id, ops = ack.received_ops, "sync delivered");
                    info.last_sync = Some(now);
                    peers_reached += 1;
                }
                Err(err) => {
                    warn!(peer = %peer_id, error = %err, "sync delivery failed");
                    peers_failed += 1;
                }
            }
        }

        self.last_sync = Some(now);
        self.stats.syncs_completed += 1;
        SyncOutcome::Synced {
            payload,
            peers_reached,
            peers_failed,
        }
    }

    /// Whether a remote update to an atom should overwrite local state:
    /// the remote counter on the source's own slot must exceed the local
    /// counter for that slot.
    pub fn should_apply(&self, atom: &Uuid, source: &str, remote: &VersionVector) -> bool {
        let local = self.versions.get(atom).map(|vv| vv.get(source)).unwrap_or(0);
        remote.get(source) > local
    }

    /// Replay a batch of remote mutations under the version-vector test.
    ///
    /// Absent atoms are created with the remote's truth, attention, and
    /// metadata (links resolve their full outgoing uuid lists). Present
    /// atoms are overwritten only when the remote wins its own slot;
    /// rejected ops count as conflicts. Either way the local vector is
    /// pointwise-maxed with the remote's.
    pub fn apply_remote_ops(&mut self, source: &str, ops: &[PendingOp]) -> AppliedBatch {
        let mut batch = AppliedBatch::default();
        for pending in ops {
            let id = pending.op.atom_id();
            match &pending.op {
                ReplicatedOp::AddNode {
                    atom_type,
                    name,
                    truth,
                    attention,
                    metadata,
                    ..
                } => {
                    if self.store.contains(&id) {
                        self.apply_overwrite(&mut batch, id, source, &pending.version, *truth, *attention);
                    } else if let Some(existing) = self.store.get_node(atom_type, name).map(|a| a.id) {
                        // Concurrent create: another member minted its own
                        // uuid for the same (type, name) identity. Local
                        // identity wins; the op is a conflict.
                        debug!(%source, name, "concurrent node create rejected");
                        batch.conflicts += 1;
                        self.versions.entry(existing).or_default().merge(&pending.version);
                    } else {
                        let mut atom = Atom::node(
                            atom_type.clone(),
                            name.clone(),
                            *truth,
                            *attention,
                            self.clock.now(),
                        );
                        atom.id = id;
                        atom.metadata = metadata.clone();
                        match self.store.insert_prepared(atom) {
                            Ok(_) => {
                                batch.applied += 1;
                                self.versions.entry(id).or_default().merge(&pending.version);
                            }
                            Err(err) => {
                                warn!(%source, error = %err, "remote node rejected");
                                batch.conflicts += 1;
                            }
                        }
                    }
                }
                ReplicatedOp::AddLink {
                    link_type,
                    outgoing,
                    truth,
                    attention,
                    metadata,
                    ..
                } => {
                    if self.store.contains(&id) {
                        self.apply_overwrite(&mut batch, id, source, &pending.version, *truth, *attention);
                    } else if let Some(existing) = self.store.find_link(link_type, outgoing) {
                        debug!(%source, link_type, "concurrent link create rejected");
                        batch.conflicts += 1;
                        self.versions.entry(existing).or_default().merge(&pending.version);
                    } else {
                        let mut atom = Atom::link(
                            link_type.clone(),
                            outgoing.clone(),
                            *truth,
                            *attention,
                            self.clock.now(),
                        );
                        atom.id = id;
                        atom.metadata = metadata.clone();
                        match self.store.insert_prepared(atom) {
                            Ok(_) => {
                                batch.applied += 1;
                                self.versions.entry(id).or_default().merge(&pending.version);
                            }
                            Err(err) => {
                                // Outgoing uuids the local store has never
                                // seen; the link cannot be reconstructed.
                                warn!(%source, error = %err, "remote link unresolvable");
                                batch.conflicts += 1;
                            }
                        }
                    }
                }
                ReplicatedOp::SetAttention { attention, .. } => {
                    if !self.store.contains(&id) {
                        debug!(%source, atom = %id, "attention op for unknown atom rejected");
                        batch.conflicts += 1;
                        continue;
                    }
                    if self.should_apply(&id, source, &pending.version) {
                        let _ = self.store.set_attention(&id, *attention);
                        batch.applied += 1;
                    } else {
                        batch.conflicts += 1;
                    }
                    self.versions.entry(id).or_default().merge(&pending.version);
                }
            }
        }

        self.stats.remote_ops_applied += batch.applied as u64;
        self.stats.conflicts += batch.conflicts as u64;
        debug!(
            %source,
            applied = batch.applied,
            conflicts = batch.conflicts,
            "remote batch applied"
        );
        batch
    }

    fn apply_overwrite(
        &mut self,
        batch: &mut AppliedBatch,
        id: Uuid,
        source: &str,
        remote: &VersionVector,
        truth: TruthValue,
        attention: f64,
    ) {
        if self.should_apply(&id, source, remote) {
            let _ = self.store.set_truth(&id, truth);
            let _ = self.store.set_attention(&id, attention);
            batch.applied += 1;
        } else {
            batch.conflicts += 1;
        }
        self.versions.entry(id).or_default().merge(remote);
    }

    // ========================================================================
    // QUERY
    // ========================================================================

    /// Query across the cluster. The local result returns immediately;
    /// results arriving from peers are merged with
    /// [`Replicator::merge_remote_matches`] as they come in.
    pub fn distributed_query(&self, pattern: &Pattern) -> Vec<QueryMatch> {
        self.store.query(pattern)
    }

    /// Merge a batch of remote query results into a local result set,
    /// de-duplicating by atom uuid.
    pub fn merge_remote_matches(
        mut local: Vec<QueryMatch>,
        remote: Vec<QueryMatch>,
    ) -> Vec<QueryMatch> {
        for candidate in remote {
            if !local.iter().any(|m| m.atom.id == candidate.atom.id) {
                local.push(candidate);
            }
        }
        local
    }

    // ========================================================================
    // MEMBERSHIP
    // ========================================================================

    /// Register a peer by id and transport address.
    pub fn add_peer(&mut self, node_id: impl Into<String>, address: impl Into<String>) {
        let node_id = node_id.into();
        info!(peer = %node_id, "peer registered");
        self.peers.insert(
            node_id,
            PeerInfo {
                address: address.into(),
                last_sync: None,
            },
        );
    }

    /// Join a cluster through its leader. No atoms move; subsequent syncs
    /// carry the state.
    pub fn join_cluster(&mut self, leader_id: impl Into<String>, leader_address: impl Into<String>) {
        let leader_id = leader_id.into();
        info!(leader = %leader_id, "joining cluster");
        self.add_peer(leader_id, leader_address);
    }

    /// Leave the cluster, forgetting every peer.
    pub fn leave_cluster(&mut self) {
        info!(peers = self.peers.len(), "leaving cluster");
        self.peers.clear();
    }
}

// ============================================================================
// TESTS
// ============================================================================
