//! Attention dynamics - spreading, decay, and the attention ranking
//!
//! Attention is the scalar economy of the hypergraph: it rises when an
//! atom participates in cognition and leaks away otherwise. Spreading
//! walks the incoming index (never pointer graphs); recursion depth is
//! the only cycle bound.

use uuid::Uuid;

use crate::atom::store::{AtomStore, Result, StoreError};
use crate::atom::types::Atom;

impl AtomStore {
    /// Spread attention outward from a source atom.
    ///
    /// For every link whose outgoing set contains `source`, the link's
    /// attention is raised by `factor * source.attention` (clamped to 1.0);
    /// the spread then recurses with a halved factor into every *other*
    /// member of that link's outgoing set, up to `depth` levels.
    /// `depth <= 0` is a no-op. Cycles are bounded purely by depth.
    pub fn spread_attention(&mut self, source: &Uuid, factor: f64, depth: i32) -> Result<()> {
        if !self.contains(source) {
            return Err(StoreError::NotFound(*source));
        }
        self.spread_level(source, factor, depth);
        Ok(())
    }

    fn spread_level(&mut self, source: &Uuid, factor: f64, depth: i32) {
        if depth <= 0 {
            return;
        }
        let source_attention = match self.get(source) {
            Some(atom) => atom.attention,
            None => return,
        };
        let links: Vec<Uuid> = self.incoming_links(source).to_vec();
        for link_id in links {
            let siblings: Vec<Uuid> = {
                let Some(link) = self.get_mut(&link_id) else {
                    continue;
                };
                link.attention = (link.attention + factor * source_attention).min(1.0);
                link.outgoing
                    .iter()
                    .copied()
                    .filter(|id| id != source)
                    .collect()
            };
            for sibling in siblings {
                self.spread_level(&sibling, factor / 2.0, depth - 1);
            }
        }
    }

    /// Multiply every atom's attention by the configured decay rate.
    pub fn decay_attention(&mut self) {
        let rate = self.decay_rate();
        let ids: Vec<Uuid> = self.iter().map(|a| a.id).collect();
        for id in ids {
            if let Some(atom) = self.get_mut(&id) {
                atom.attention *= rate;
            }
        }
    }

    /// The `k` atoms with the highest current attention.
    ///
    /// Ties are broken by insertion order, which is as arbitrary as any.
    pub fn top_attention(&self, k: usize) -> Vec<&Atom> {
        let mut ranked: Vec<&Atom> = self.iter().collect();
        ranked.sort_by(|a, b| {
            b.attention
                .partial_cmp(&a.attention)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);
        ranked
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::store::DEFAULT_DECAY_RATE;
    use crate::atom::types::{OutgoingSpec, TruthValue};
    use crate::clock::SystemClock;
    use std::sync::Arc;

    fn store() -> AtomStore {
        AtomStore::new()
    }

    #[test]
    fn test_spread_raises_containing_link() {
        let mut s = store();
        let cat = s
            .add_node("ConceptNode", "cat", Some(TruthValue::new(0.9, 0.9)), Some(0.8), None)
            .unwrap();
        let link = s
            .add_link("InheritanceLink", &["cat".into(), "animal".into()], None, Some(0.1), None)
            .unwrap();

        s.spread_attention(&cat, 0.5, 1).unwrap();

        // 0.1 + 0.5 * 0.8 = 0.5
        let got = s.get(&link).unwrap().attention;
        assert!((got - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_spread_clamps_at_one() {
        let mut s = store();
        let cat = s
            .add_node("ConceptNode", "cat", None, Some(1.0), None)
            .unwrap();
        let link = s
            .add_link("InheritanceLink", &["cat".into(), "animal".into()], None, Some(0.9), None)
            .unwrap();
        s.spread_attention(&cat, 1.0, 1).unwrap();
        assert_eq!(s.get(&link).unwrap().attention, 1.0);
    }

    #[test]
    fn test_spread_depth_zero_is_noop() {
        let mut s = store();
        let cat = s
            .add_node("ConceptNode", "cat", None, Some(1.0), None)
            .unwrap();
        let link = s
            .add_link("InheritanceLink", &["cat".into(), "animal".into()], None, Some(0.1), None)
            .unwrap();
        s.spread_attention(&cat, 0.9, 0).unwrap();
        assert_eq!(s.get(&link).unwrap().attention, 0.1);
    }

    #[test]
    fn test_spread_recurses_into_siblings_with_halved_factor() {
        let mut s = store();
        // cat -inherits-> animal, animal -inherits-> organism
        let cat = s
            .add_node("ConceptNode", "cat", None, Some(0.8), None)
            .unwrap();
        let first = s
            .add_link("InheritanceLink", &["cat".into(), "animal".into()], None, Some(0.0), None)
            .unwrap();
        let second = s
            .add_link(
                "InheritanceLink",
                &["animal".into(), "organism".into()],
                None,
                Some(0.0),
                None,
            )
            .unwrap();

        s.spread_attention(&cat, 0.5, 2).unwrap();

        // Level 1: first link raised by 0.5 * 0.8 = 0.4. Level 2 spreads
        // from animal (default attention 0.5) with the halved factor into
        // every link containing it, so first gains another 0.25 * 0.5.
        assert!((s.get(&first).unwrap().attention - 0.525).abs() < 1e-9);
        assert!((s.get(&second).unwrap().attention - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_spread_on_cycle_terminates_by_depth() {
        let mut s = store();
        let a = s.add_node("ConceptNode", "a", None, Some(0.5), None).unwrap();
        let b = s.add_node("ConceptNode", "b", None, Some(0.5), None).unwrap();
        s.add_link(
            "SimilarityLink",
            &[OutgoingSpec::Id(a), OutgoingSpec::Id(b)],
            None,
            Some(0.0),
            None,
        )
        .unwrap();
        s.add_link(
            "SimilarityLink",
            &[OutgoingSpec::Id(b), OutgoingSpec::Id(a)],
            None,
            Some(0.0),
            None,
        )
        .unwrap();

        // No visited set: the walk bounces a<->b and must still halt.
        s.spread_attention(&a, 0.5, 8).unwrap();
    }

    #[test]
    fn test_spread_unknown_source_errors() {
        let mut s = store();
        let ghost = Uuid::new_v4();
        assert!(matches!(
            s.spread_attention(&ghost, 0.5, 2),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_decay_multiplies_every_atom() {
        let mut s = AtomStore::with_config(100, 0.5, Arc::new(SystemClock));
        let a = s.add_node("ConceptNode", "a", None, Some(0.8), None).unwrap();
        let b = s.add_node("ConceptNode", "b", None, Some(0.2), None).unwrap();
        s.decay_attention();
        assert!((s.get(&a).unwrap().attention - 0.4).abs() < 1e-9);
        assert!((s.get(&b).unwrap().attention - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_default_decay_rate_is_gentle() {
        let mut s = store();
        let a = s.add_node("ConceptNode", "a", None, Some(1.0), None).unwrap();
        s.decay_attention();
        assert!((s.get(&a).unwrap().attention - DEFAULT_DECAY_RATE).abs() < 1e-9);
    }

    #[test]
    fn test_top_attention_ranks_and_truncates() {
        let mut s = store();
        s.add_node("ConceptNode", "low", None, Some(0.1), None).unwrap();
        s.add_node("ConceptNode", "high", None, Some(0.9), None).unwrap();
        s.add_node("ConceptNode", "mid", None, Some(0.5), None).unwrap();

        let top = s.top_attention(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name.as_deref(), Some("high"));
        assert_eq!(top[1].name.as_deref(), Some("mid"));

        assert_eq!(s.top_attention(10).len(), 3);
    }

    #[test]
    fn test_forgotten_after_decay_to_zero() {
        let mut s = AtomStore::with_config(100, 0.0, Arc::new(SystemClock));
        let a = s.add_node("ConceptNode", "fading", None, Some(0.7), None).unwrap();
        s.decay_attention();
        let atom = s.get(&a).unwrap();
        assert!(atom.is_forgotten());
        // Forgotten atoms stay in the store.
        assert_eq!(s.len(), 1);
    }
}
