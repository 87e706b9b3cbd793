//! Random collaborator - injectable uniform draws
//!
//! Randomness in the kernel is deliberately small: final scheduler
//! tie-breaks (equal score and equal wait) and cognitive-resource id
//! generation. Both go through this trait so tests can pin the outcome.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of uniform random draws.
pub trait Random: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&self) -> f64;

    /// Uniform integer draw in `[0, bound)`. `bound` must be non-zero.
    fn next_u64(&self, bound: u64) -> u64;
}

/// Production randomness backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl Random for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn next_u64(&self, bound: u64) -> u64 {
        rand::rng().random_range(0..bound)
    }
}

/// Deterministic randomness for tests, seeded once.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a generator from a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Random for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.rng.lock().expect("rng poisoned").random::<f64>()
    }

    fn next_u64(&self, bound: u64) -> u64 {
        self.rng.lock().expect("rng poisoned").random_range(0..bound)
    }
}
