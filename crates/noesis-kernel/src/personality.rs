//! PersonalityProvider - the trait-lookup collaborator contract
//!
//! The kernel never mutates personality traits; it reads them when
//! configuring child processes and leaves scoring to the scheduler.
//! Providers are external collaborators; [`TraitProfile`] is the bundled
//! map-backed implementation. Writes to immutable traits are rejected
//! with a warning and no state change - never fatal.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Read-only trait lookups plus derivation of child providers.
pub trait PersonalityProvider: Send + Sync {
    /// A trait value in `[0, 1]`, if the trait exists.
    fn get(&self, name: &str) -> Option<f64>;

    /// Trait names, sorted.
    fn traits(&self) -> Vec<String>;

    /// Derive a child provider. `rate` in `[0, 1]` controls how strongly
    /// the child inherits: 1.0 copies the parent, 0.0 regresses fully to
    /// the neutral midpoint.
    fn inherit(&self, rate: f64) -> Box<dyn PersonalityProvider>;
}

/// Neutral midpoint that inheritance regresses toward.
const NEUTRAL_TRAIT: f64 = 0.5;

/// A map-backed personality. Traits can be marked immutable, after which
/// writes warn and bounce.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitProfile {
    traits: BTreeMap<String, f64>,
    immutable: BTreeSet<String>,
}

impl TraitProfile {
    /// An empty profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style trait insertion, clamped to `[0, 1]`.
    pub fn with_trait(mut self, name: impl Into<String>, value: f64) -> Self {
        self.traits.insert(name.into(), value.clamp(0.0, 1.0));
        self
    }

    /// Mark a trait immutable. Subsequent writes are rejected.
    pub fn mark_immutable(mut self, name: impl Into<String>) -> Self {
        self.immutable.insert(name.into());
        self
    }

    /// Write a trait value. Returns whether the write took effect;
    /// immutable traits warn and leave state unchanged.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        if self.immutable.contains(name) {
            warn!(name, value, "write to immutable trait rejected");
            return false;
        }
        self.traits.insert(name.to_string(), value.clamp(0.0, 1.0));
        true
    }
}

impl PersonalityProvider for TraitProfile {
    fn get(&self, name: &str) -> Option<f64> {
        self.traits.get(name).copied()
    }

    fn traits(&self) -> Vec<String> {
        self.traits.keys().cloned().collect()
    }

    fn inherit(&self, rate: f64) -> Box<dyn PersonalityProvider> {
        let rate = rate.clamp(0.0, 1.0);
        let traits = self
            .traits
            .iter()
            .map(|(name, &value)| {
                let inherited = NEUTRAL_TRAIT + (value - NEUTRAL_TRAIT) * rate;
                (name.clone(), inherited)
            })
            .collect();
        Box::new(TraitProfile {
            traits,
            immutable: self.immutable.clone(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> TraitProfile {
        TraitProfile::new()
            .with_trait("curiosity", 0.9)
            .with_trait("caution", 0.3)
            .mark_immutable("caution")
    }

    #[test]
    fn test_get_and_listing() {
        let p = profile();
        assert_eq!(p.get("curiosity"), Some(0.9));
        assert_eq!(p.get("unknown"), None);
        assert_eq!(p.traits(), vec!["caution".to_string(), "curiosity".to_string()]);
    }

    #[test]
    fn test_values_clamped() {
        let p = TraitProfile::new().with_trait("zeal", 1.8);
        assert_eq!(p.get("zeal"), Some(1.0));
    }

    #[test]
    fn test_immutable_write_rejected_without_change() {
        let mut p = profile();
        assert!(!p.set("caution", 0.9));
        assert_eq!(p.get("caution"), Some(0.3));

        assert!(p.set("curiosity", 0.5));
        assert_eq!(p.get("curiosity"), Some(0.5));
    }

    #[test]
    fn test_inherit_regresses_toward_neutral() {
        let p = profile();
        let child = p.inherit(0.5);
        // 0.5 + (0.9 - 0.5) * 0.5 = 0.7
        assert!((child.get("curiosity").unwrap() - 0.7).abs() < 1e-9);
        // 0.5 + (0.3 - 0.5) * 0.5 = 0.4
        assert!((child.get("caution").unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_inherit_extremes() {
        let p = profile();
        let copy = p.inherit(1.0);
        assert_eq!(copy.get("curiosity"), Some(0.9));

        let blank = p.inherit(0.0);
        assert_eq!(blank.get("curiosity"), Some(NEUTRAL_TRAIT));
    }
}
