//! AtomStore - the owning hypergraph store
//!
//! The store exclusively owns every atom. External holders keep opaque
//! uuids and resolve them through the store's indices; links store uuids
//! in their outgoing sets, never references. Four indices are maintained:
//!
//! - by uuid (primary ownership)
//! - nodes by `(type, name)` - this pair is an identity, re-adding upserts
//! - links by `(type, hash of outgoing uuids)` - structural identity
//! - incoming: atom -> links that reference it, used by attention spreading
//!
//! Insertion order is preserved so scans and query results are
//! deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::atom::types::{
    is_variable, variable_name, Atom, Bindings, OutgoingSpec, Pattern, QueryMatch, TruthValue,
    DEFAULT_ATTENTION,
};
use crate::clock::{Clock, SystemClock};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default maximum number of atoms the store will hold.
pub const DEFAULT_ATOM_CAPACITY: usize = 1_000_000;

/// Default per-pass attention decay rate.
pub const DEFAULT_DECAY_RATE: f64 = 0.995;

/// Truth/attention constants for the convenience recorders. These feed
/// attention-ranked queries downstream and must not drift.
pub(crate) const RECORDER_STRENGTH: f64 = 0.99;
pub(crate) const RECORDER_CONFIDENCE: f64 = 0.95;
pub(crate) const RECORDER_ATTENTION: f64 = 0.95;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by store mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An outgoing entry references a uuid the store does not own
    #[error("invalid reference: {0} is not owned by this store")]
    InvalidReference(Uuid),
    /// Links must reference at least one atom
    #[error("link outgoing set must not be empty")]
    EmptyOutgoing,
    /// The configured atom capacity has been reached
    #[error("atom capacity exceeded ({0} atoms)")]
    CapacityExceeded(usize),
    /// No atom with this uuid
    #[error("atom not found: {0}")]
    NotFound(Uuid),
}

/// Store result type
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// STATS
// ============================================================================

/// Aggregate statistics over the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Total atoms held
    pub total_atoms: usize,
    /// Node count
    pub node_count: usize,
    /// Link count
    pub link_count: usize,
    /// Distinct type labels seen
    pub type_count: usize,
    /// Mean attention over all atoms (0.0 when empty)
    pub mean_attention: f64,
    /// Configured capacity
    pub capacity: usize,
}

// ============================================================================
// ATOM STORE
// ============================================================================

/// The owning hypergraph store.
pub struct AtomStore {
    atoms: HashMap<Uuid, Atom>,
    /// Insertion order, for deterministic scans
    order: Vec<Uuid>,
    node_index: HashMap<(String, String), Uuid>,
    link_index: HashMap<(String, u64), Uuid>,
    /// Links referencing a given atom in their outgoing set
    incoming: HashMap<Uuid, Vec<Uuid>>,
    capacity: usize,
    decay_rate: f64,
    clock: Arc<dyn Clock>,
}

impl Default for AtomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomStore {
    /// Create a store with default capacity and decay rate.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_ATOM_CAPACITY, DEFAULT_DECAY_RATE, Arc::new(SystemClock))
    }

    /// Create a store with explicit capacity, decay rate, and clock.
    pub fn with_config(capacity: usize, decay_rate: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            atoms: HashMap::new(),
            order: Vec::new(),
            node_index: HashMap::new(),
            link_index: HashMap::new(),
            incoming: HashMap::new(),
            capacity,
            decay_rate,
            clock,
        }
    }

    // ========================================================================
    // ADDITION
    // ========================================================================

    /// Add a node, or upsert the existing one.
    ///
    /// Nodes are identified by `(type, name)`: when a node with that pair
    /// already exists, its truth and attention are overwritten with the
    /// provided arguments, metadata entries are merged in, and the
    /// existing atom's id is returned.
    pub fn add_node(
        &mut self,
        atom_type: &str,
        name: &str,
        truth: Option<TruthValue>,
        attention: Option<f64>,
        metadata: Option<BTreeMap<String, Value>>,
    ) -> Result<Uuid> {
        let key = (atom_type.to_string(), name.to_string());
        if let Some(&id) = self.node_index.get(&key) {
            let now = self.clock.now();
            let atom = self.atoms.get_mut(&id).expect("node index out of sync");
            if let Some(tv) = truth {
                atom.truth = tv;
            }
            if let Some(av) = attention {
                atom.attention = av.clamp(0.0, 1.0);
            }
            if let Some(meta) = metadata {
                atom.metadata.extend(meta);
            }
            atom.updated_at = now;
            return Ok(id);
        }

        self.check_capacity()?;
        let mut atom = Atom::node(
            atom_type,
            name,
            truth.unwrap_or_default(),
            attention.unwrap_or(DEFAULT_ATTENTION),
            self.clock.now(),
        );
        if let Some(meta) = metadata {
            atom.metadata = meta;
        }
        let id = atom.id;
        self.node_index.insert(key, id);
        self.index_atom(atom);
        Ok(id)
    }

    /// Add a link over the given outgoing set, or return the existing one.
    ///
    /// Bare-name entries resolve to `ConceptNode`s of that name, created on
    /// demand. Uuid entries must already be owned by this store, otherwise
    /// the operation is rejected with [`StoreError::InvalidReference`] and
    /// no state changes. A link with identical `(type, outgoing)` already
    /// present is upserted like a node.
    pub fn add_link(
        &mut self,
        link_type: &str,
        outgoing: &[OutgoingSpec],
        truth: Option<TruthValue>,
        attention: Option<f64>,
        metadata: Option<BTreeMap<String, Value>>,
    ) -> Result<Uuid> {
        if outgoing.is_empty() {
            return Err(StoreError::EmptyOutgoing);
        }
        // Validate uuid references before creating any implied node, so a
        // rejected call leaves the store untouched.
        for spec in outgoing {
            if let OutgoingSpec::Id(id) = spec {
                if !self.atoms.contains_key(id) {
                    return Err(StoreError::InvalidReference(*id));
                }
            }
        }

        let resolved = self.resolve_outgoing(outgoing)?;
        let key = (link_type.to_string(), hash_outgoing(&resolved));
        if let Some(&id) = self.link_index.get(&key) {
            let now = self.clock.now();
            let atom = self.atoms.get_mut(&id).expect("link index out of sync");
            if let Some(tv) = truth {
                atom.truth = tv;
            }
            if let Some(av) = attention {
                atom.attention = av.clamp(0.0, 1.0);
            }
            if let Some(meta) = metadata {
                atom.metadata.extend(meta);
            }
            atom.updated_at = now;
            return Ok(id);
        }

        self.check_capacity()?;
        let mut atom = Atom::link(
            link_type,
            resolved,
            truth.unwrap_or_default(),
            attention.unwrap_or(DEFAULT_ATTENTION),
            self.clock.now(),
        );
        if let Some(meta) = metadata {
            atom.metadata = meta;
        }
        let id = atom.id;
        self.link_index.insert(key, id);
        self.index_atom(atom);
        Ok(id)
    }

    /// Resolve outgoing specs into uuids, creating `ConceptNode`s for bare
    /// names as needed.
    fn resolve_outgoing(&mut self, outgoing: &[OutgoingSpec]) -> Result<Vec<Uuid>> {
        let mut resolved = Vec::with_capacity(outgoing.len());
        for spec in outgoing {
            match spec {
                OutgoingSpec::Id(id) => {
                    if !self.atoms.contains_key(id) {
                        return Err(StoreError::InvalidReference(*id));
                    }
                    resolved.push(*id);
                }
                OutgoingSpec::Name(name) => {
                    let id = match self.node_index.get(&("ConceptNode".to_string(), name.clone())) {
                        Some(&id) => id,
                        None => self.add_node("ConceptNode", name, None, None, None)?,
                    };
                    resolved.push(id);
                }
            }
        }
        Ok(resolved)
    }

    /// Insert a fully-formed atom under its own id, indexing it.
    ///
    /// Used by the replication layer to materialize remote atoms with
    /// their originating uuids. The caller is responsible for identity
    /// checks against the node/link indices.
    pub(crate) fn insert_prepared(&mut self, atom: Atom) -> Result<Uuid> {
        self.check_capacity()?;
        if atom.is_link() {
            for target in &atom.outgoing {
                if !self.atoms.contains_key(target) {
                    return Err(StoreError::InvalidReference(*target));
                }
            }
            self.link_index.insert(
                (atom.atom_type.clone(), hash_outgoing(&atom.outgoing)),
                atom.id,
            );
        } else if let Some(name) = &atom.name {
            self.node_index
                .insert((atom.atom_type.clone(), name.clone()), atom.id);
        }
        let id = atom.id;
        self.index_atom(atom);
        Ok(id)
    }

    fn index_atom(&mut self, atom: Atom) {
        let id = atom.id;
        if atom.is_link() {
            let mut seen = Vec::new();
            for target in &atom.outgoing {
                if !seen.contains(target) {
                    seen.push(*target);
                    self.incoming.entry(*target).or_default().push(id);
                }
            }
        }
        self.order.push(id);
        self.atoms.insert(id, atom);
    }

    fn check_capacity(&self) -> Result<()> {
        if self.atoms.len() >= self.capacity {
            debug!(capacity = self.capacity, "atom capacity exceeded");
            return Err(StoreError::CapacityExceeded(self.capacity));
        }
        Ok(())
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Fetch an atom by uuid.
    pub fn get(&self, id: &Uuid) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Fetch a node by its `(type, name)` identity.
    pub fn get_node(&self, atom_type: &str, name: &str) -> Option<&Atom> {
        self.node_index
            .get(&(atom_type.to_string(), name.to_string()))
            .and_then(|id| self.atoms.get(id))
    }

    /// Whether the store owns this uuid.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.atoms.contains_key(id)
    }

    /// Number of atoms held.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Iterate all atoms in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.order.iter().filter_map(|id| self.atoms.get(id))
    }

    /// Links whose outgoing set contains the given atom.
    pub(crate) fn incoming_links(&self, id: &Uuid) -> &[Uuid] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a link by its structural `(type, outgoing)` identity.
    pub(crate) fn find_link(&self, link_type: &str, outgoing: &[Uuid]) -> Option<Uuid> {
        self.link_index
            .get(&(link_type.to_string(), hash_outgoing(outgoing)))
            .copied()
    }

    pub(crate) fn get_mut(&mut self, id: &Uuid) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    pub(crate) fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Set an atom's attention, clamped into `[0, 1]`.
    pub fn set_attention(&mut self, id: &Uuid, attention: f64) -> Result<()> {
        let now = self.clock.now();
        let atom = self.atoms.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        atom.attention = attention.clamp(0.0, 1.0);
        atom.updated_at = now;
        Ok(())
    }

    /// Set an atom's truth value.
    pub fn set_truth(&mut self, id: &Uuid, truth: TruthValue) -> Result<()> {
        let now = self.clock.now();
        let atom = self.atoms.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        atom.truth = truth;
        atom.updated_at = now;
        Ok(())
    }

    // ========================================================================
    // PATTERN QUERY
    // ========================================================================

    /// Run a declarative pattern query.
    ///
    /// Results come back in insertion order. Variables (leading `?`) bind
    /// to matched names; a variable repeated within one pattern must bind
    /// consistently.
    pub fn query(&self, pattern: &Pattern) -> Vec<QueryMatch> {
        self.iter()
            .filter_map(|atom| {
                self.match_atom(atom, pattern).map(|bindings| QueryMatch {
                    atom: atom.clone(),
                    bindings,
                })
            })
            .collect()
    }

    fn match_atom(&self, atom: &Atom, pattern: &Pattern) -> Option<Bindings> {
        if let Some(t) = &pattern.atom_type {
            if atom.atom_type != *t {
                return None;
            }
        }

        let mut bindings = Bindings::new();

        if let Some(name_pat) = &pattern.name {
            if is_variable(name_pat) {
                let repr = atom
                    .name
                    .clone()
                    .unwrap_or_else(|| atom.id.to_string());
                bind(&mut bindings, variable_name(name_pat), repr)?;
            } else if atom.name.as_deref() != Some(name_pat.as_str()) {
                return None;
            }
        }

        if let Some(out_pat) = &pattern.outgoing {
            if !atom.is_link() || out_pat.len() != atom.outgoing.len() {
                return None;
            }
            for (elem, target_id) in out_pat.iter().zip(&atom.outgoing) {
                let target = self.atoms.get(target_id)?;
                if is_variable(elem) {
                    let repr = target
                        .name
                        .clone()
                        .unwrap_or_else(|| target.id.to_string());
                    bind(&mut bindings, variable_name(elem), repr)?;
                } else if target.name.as_deref() != Some(elem.as_str()) {
                    return None;
                }
            }
        }

        if let Some(floor) = pattern.min_strength {
            if atom.truth.strength < floor {
                return None;
            }
        }
        if let Some(floor) = pattern.min_confidence {
            if atom.truth.confidence < floor {
                return None;
            }
        }
        if let Some(floor) = pattern.min_attention {
            if atom.attention < floor {
                return None;
            }
        }

        Some(bindings)
    }

    // ========================================================================
    // RECORDERS
    // ========================================================================

    /// Record a failure of purposeful completion as a high-attention
    /// evaluation so downstream attention-ranked queries surface it.
    pub fn record_entelechy_failure(&mut self, description: &str, severity: f64) -> Result<Uuid> {
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

    /// Record a transcendent insight about a concept as a high-attention
    /// inheritance into the `TranscendentInsight` anchor.
    pub fn record_transcendence(&mut self, concept: &str, insight: &str) -> Result<Uuid> {
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

    // ========================================================================
    // STATS
    // ========================================================================

    /// Aggregate statistics.
    pub fn stats(&self) -> StoreStats {
        let node_count = self.iter().filter(|a| a.is_node()).count();
        let link_count = self.atoms.len() - node_count;
        let mean_attention = if self.atoms.is_empty() {
            0.0
        } else {
            self.iter().map(|a| a.attention).sum::<f64>() / self.atoms.len() as f64
        };
        let mut types: Vec<&str> = self.iter().map(|a| a.atom_type.as_str()).collect();
        types.sort_unstable();
        types.dedup();
        StoreStats {
            total_atoms: self.atoms.len(),
            node_count,
            link_count,
            type_count: types.len(),
            mean_attention,
            capacity: self.capacity,
        }
    }
}

/// Bind a variable, requiring consistency with any previous binding.
fn bind(bindings: &mut Bindings, var: &str, value: String) -> Option<()> {
    match bindings.get(var) {
        Some(existing) if *existing != value => None,
        Some(_) => Some(()),
        None => {
            bindings.insert(var.to_string(), value);
            Some(())
        }
    }
}

/// Structural hash of an ordered outgoing set.
fn hash_outgoing(outgoing: &[Uuid]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for id in outgoing {
        id.as_bytes().hash(&mut hasher);
    }
    hasher.finish()
}

// ============================================================================
// TESTS
// ============================================================================
