//! Deterministic test doubles for kernel collaborators.

pub mod transport;

pub use transport::RecordingTransport;
