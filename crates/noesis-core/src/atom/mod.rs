//! # Hypergraph Atoms
//!
//! The addressable memory of the cognitive kernel. Knowledge lives as
//! atoms - named Nodes and structured Links - each carrying a truth value,
//! an attention value, and opaque metadata. The [`AtomStore`] is the single
//! owner of every atom; everything else holds uuids.
//!
//! Attention is the currency: queries can rank by it, spreading moves it
//! along link structure, and decay reclaims it. An atom whose attention
//! reaches zero is forgotten but never removed.

mod attention;
pub mod store;
pub mod types;

pub use store::{AtomStore, Result, StoreError, StoreStats, DEFAULT_ATOM_CAPACITY, DEFAULT_DECAY_RATE};
pub use types::{
    is_variable, variable_name, Atom, AtomKind, Bindings, OutgoingSpec, Pattern, QueryMatch,
    TruthValue, DEFAULT_ATTENTION,
};
