//! End-to-end test support for the Noesis kernel.
//!
//! The harness builds kernels with deterministic collaborators (manual
//! clock, seeded randomness, recording transport) and provides the small
//! agent-driver behaviors the kernel itself deliberately leaves to
//! drivers: cascading shutdown and oldest-subordinate deprecation.

pub mod harness;
pub mod mocks;
