//! # Peer Registry
//!
//! The set of open connections, owned by the dispatcher task. Nothing else
//! touches it, so there is no lock.
//!
//! Each peer is the sending half of an unbounded channel drained by that
//! connection's writer task. A send only fails once the writer is gone,
//! which is how dead peers are found and pruned.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::HubMessage;

/// Identifies one connection for its lifetime.
pub type PeerId = Uuid;

/// Outcome of one broadcast sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

/// A connection's outgoing queue, as seen by request handlers.
#[derive(Debug, Clone)]
pub struct PeerContext {
    pub id: PeerId,
    tx: UnboundedSender<String>,
}

impl PeerContext {
    pub fn new(id: PeerId, tx: UnboundedSender<String>) -> Self {
        PeerContext { id, tx }
    }

    /// The raw queue, handed to the registry on join.
    pub fn sender(&self) -> UnboundedSender<String> {
        self.tx.clone()
    }

    /// Sends a message to this peer only. Returns false if it is gone.
    pub fn reply(&self, message: &HubMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.tx.send(json).is_ok(),
            Err(e) => {
                warn!(peer = %self.id, error = %e, "Failed to serialize reply");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, UnboundedSender<String>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, id: PeerId, tx: UnboundedSender<String>) {
        self.peers.insert(id, tx);
        debug!(peer = %id, peers = self.peers.len(), "Peer joined");
    }

    /// Removing an unknown peer is a no-op.
    pub fn leave(&mut self, id: &PeerId) {
        if self.peers.remove(id).is_some() {
            debug!(peer = %id, peers = self.peers.len(), "Peer left");
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Queues a message to one peer.
    pub fn send_to(&mut self, id: &PeerId, message: &HubMessage) -> bool {
        let Some(tx) = self.peers.get(id) else {
            return false;
        };
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(peer = %id, error = %e, "Failed to serialize message");
                return false;
            }
        };
        if tx.send(json).is_err() {
            self.leave(id);
            return false;
        }
        true
    }

    /// Queues a message to every peer.
    ///
    /// Serializes once. Peers whose queue is closed are removed after the
    /// sweep; one dead peer never stops delivery to the others.
    pub fn broadcast(&mut self, message: &HubMessage) -> BroadcastReport {
        if self.peers.is_empty() {
            return BroadcastReport::default();
        }

        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "Failed to serialize broadcast");
                return BroadcastReport::default();
            }
        };

        let mut dead = Vec::new();
        for (id, tx) in &self.peers {
            if tx.send(json.clone()).is_err() {
                dead.push(*id);
            }
        }

        for id in &dead {
            self.peers.remove(id);
        }

        let report = BroadcastReport {
            delivered: self.peers.len(),
            dropped: dead.len(),
        };
        if report.dropped > 0 {
            debug!(kind = message.kind(), dropped = report.dropped, "Pruned dead peers");
        }
        report
    }
}
