//! Recording transport - captures sync payloads instead of sending them
//!
//! Tests hand-deliver captured payloads to other replicas with
//! `apply_remote_ops`, and can mark peers as failing to exercise the
//! per-peer delivery error path.

use std::collections::HashSet;
use std::sync::Mutex;

use noesis_core::{Ack, SyncPayload, Transport, TransportError};

/// A transport that remembers every delivery and can simulate outages.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, SyncPayload)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    /// A transport with no history and no outages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, as `(peer, payload)` pairs.
    pub fn deliveries(&self) -> Vec<(String, SyncPayload)> {
        self.sent.lock().expect("transport poisoned").clone()
    }

    /// Payloads sent to one peer.
    pub fn deliveries_to(&self, peer: &str) -> Vec<SyncPayload> {
        self.deliveries()
            .into_iter()
            .filter(|(p, _)| p == peer)
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Start failing deliveries to a peer.
    pub fn fail_peer(&self, peer: impl Into<String>) {
        self.failing
            .lock()
            .expect("transport poisoned")
            .insert(peer.into());
    }

    /// Stop failing deliveries to a peer.
    pub fn heal_peer(&self, peer: &str) {
        self.failing.lock().expect("transport poisoned").remove(peer);
    }
}

impl Transport for RecordingTransport {
    fn send(&self, node_id: &str, payload: &SyncPayload) -> Result<Ack, TransportError> {
        if self
            .failing
            .lock()
            .expect("transport poisoned")
            .contains(node_id)
        {
            return Err(TransportError::Unreachable(node_id.to_string()));
        }
        self.sent
            .lock()
            .expect("transport poisoned")
            .push((node_id.to_string(), payload.clone()));
        Ok(Ack {
            node_id: node_id.to_string(),
            received_ops: payload.ops.len(),
        })
    }
}
