//! Atom types - the fundamental units of hypergraph storage
//!
//! Every piece of knowledge the kernel can address is an atom: either a
//! named Node or a Link whose ordered outgoing set references other atoms.
//! Atoms carry a probabilistic truth value, a scalar attention value that
//! drives queries and scheduling, and an opaque metadata map the engine
//! stores but never interprets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// ATOM KIND
// ============================================================================

/// The two structural shapes an atom can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AtomKind {
    /// A named vertex, e.g. `ConceptNode "cat"`.
    #[default]
    Node,
    /// An ordered hyperedge over other atoms, e.g. `InheritanceLink (cat, animal)`.
    Link,
}

impl AtomKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AtomKind::Node => "node",
            AtomKind::Link => "link",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "link" => AtomKind::Link,
            _ => AtomKind::Node,
        }
    }
}

impl std::fmt::Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// TRUTH VALUE
// ============================================================================

/// Probabilistic truth attached to every atom.
///
/// Both components live in `[0, 1]`. Strength is the degree of truth,
/// confidence is the weight of evidence behind it. A freshly implied atom
/// (created as a side effect of link resolution) starts at full strength
/// with zero confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruthValue {
    /// Degree of truth (0.0 = false, 1.0 = true)
    pub strength: f64,
    /// Weight of evidence (0.0 = none, 1.0 = certain)
    pub confidence: f64,
}

impl TruthValue {
    /// Create a truth value, clamping both components into `[0, 1]`.
    pub fn new(strength: f64, confidence: f64) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self {
            strength: 1.0,
            confidence: 0.0,
        }
    }
}

// ============================================================================
// ATOM
// ============================================================================

/// Default attention assigned to atoms created without an explicit value.
pub const DEFAULT_ATTENTION: f64 = 0.5;

/// An atom in the hypergraph.
///
/// Nodes carry a name and an empty outgoing set; Links carry an outgoing
/// set of length >= 1 and no name. Outgoing entries are uuids resolved
/// through the owning store's index - atoms never hold references to one
/// another directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    /// Unique identifier (UUID v4)
    pub id: Uuid,
    /// Structural shape (node or link)
    pub kind: AtomKind,
    /// Type label from an open set of domain strings (`ConceptNode`, `InheritanceLink`, ...)
    pub atom_type: String,
    /// Human name (Nodes only)
    pub name: Option<String>,
    /// Probabilistic truth
    pub truth: TruthValue,
    /// Attention in `[0, 1]`, drives queries, spreading, and scheduling
    pub attention: f64,
    /// Opaque key/value metadata, stored and returned but never inspected
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Ordered references to other atoms (Links only)
    #[serde(default)]
    pub outgoing: Vec<Uuid>,
    /// When the atom was created
    pub created_at: DateTime<Utc>,
    /// When the atom was last modified
    pub updated_at: DateTime<Utc>,
}

impl Atom {
    /// Construct a Node atom.
    pub fn node(
        atom_type: impl Into<String>,
        name: impl Into<String>,
        truth: TruthValue,
        attention: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AtomKind::Node,
            atom_type: atom_type.into(),
            name: Some(name.into()),
            truth,
            attention: attention.clamp(0.0, 1.0),
            metadata: BTreeMap::new(),
            outgoing: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Construct a Link atom over an already-resolved outgoing set.
    pub fn link(
        atom_type: impl Into<String>,
        outgoing: Vec<Uuid>,
        truth: TruthValue,
        attention: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: AtomKind::Link,
            atom_type: atom_type.into(),
            name: None,
            truth,
            attention: attention.clamp(0.0, 1.0),
            metadata: BTreeMap::new(),
            outgoing,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this atom is a Node.
    #[inline]
    pub fn is_node(&self) -> bool {
        self.kind == AtomKind::Node
    }

    /// Whether this atom is a Link.
    #[inline]
    pub fn is_link(&self) -> bool {
        self.kind == AtomKind::Link
    }

    /// An atom whose attention has decayed to zero is considered forgotten.
    /// It is not removed from the store.
    #[inline]
    pub fn is_forgotten(&self) -> bool {
        self.attention <= f64::EPSILON
    }
}

// ============================================================================
// PATTERN QUERY
// ============================================================================

/// Variable bindings produced by a pattern match.
///
/// Keys are variable names without the leading `?`; values are the matched
/// node names (or uuid strings for nameless targets).
pub type Bindings = BTreeMap<String, String>;

/// Whether a pattern string is a variable (`?x` style).
#[inline]
pub fn is_variable(s: &str) -> bool {
    s.starts_with('?')
}

/// Strip the leading `?` from a variable string.
#[inline]
pub fn variable_name(s: &str) -> &str {
    s.trim_start_matches('?')
}

/// A declarative query over the store.
///
/// All fields are optional; an empty pattern matches every atom. Name and
/// outgoing elements starting with `?` are variables and bind instead of
/// matching literally. Threshold fields are inclusive lower bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Pattern {
    /// Exact type label to match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atom_type: Option<String>,
    /// Node name, literal or `?variable`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Positional outgoing match for Links; must equal the outgoing length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<Vec<String>>,
    /// Minimum truth strength (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_strength: Option<f64>,
    /// Minimum truth confidence (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Minimum attention (inclusive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_attention: Option<f64>,
}

impl Pattern {
    /// Match every atom of the given type.
    pub fn by_type(atom_type: impl Into<String>) -> Self {
        Self {
            atom_type: Some(atom_type.into()),
            ..Default::default()
        }
    }

    /// Match a specific node.
    pub fn node(atom_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            atom_type: Some(atom_type.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Match links of a type against positional outgoing elements.
    pub fn link<S: Into<String>>(atom_type: impl Into<String>, outgoing: Vec<S>) -> Self {
        Self {
            atom_type: Some(atom_type.into()),
            outgoing: Some(outgoing.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Restrict to atoms at or above an attention floor.
    pub fn with_min_attention(mut self, floor: f64) -> Self {
        self.min_attention = Some(floor);
        self
    }
}

/// One result of a pattern query: the matched atom and any variable bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMatch {
    /// The matched atom
    pub atom: Atom,
    /// Variable bindings established by the match
    pub bindings: Bindings,
}

/// How a link outgoing entry is specified when adding a link.
///
/// A bare name resolves to a `ConceptNode` of that name, creating one when
/// absent; a uuid must already be owned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingSpec {
    /// Existing atom by id
    Id(Uuid),
    /// ConceptNode by name, created on demand
    Name(String),
}

impl From<Uuid> for OutgoingSpec {
    fn from(id: Uuid) -> Self {
        OutgoingSpec::Id(id)
    }
}

impl From<&str> for OutgoingSpec {
    fn from(name: &str) -> Self {
        OutgoingSpec::Name(name.to_string())
    }
}

impl From<String> for OutgoingSpec {
    fn from(name: String) -> Self {
        OutgoingSpec::Name(name)
    }
}

// ============================================================================
// TESTS
// ============================================================================
