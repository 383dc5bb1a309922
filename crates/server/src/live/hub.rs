//! Registry of connected realtime clients and fan-out of progress events.
//!
//! Every client receives every event: there is no per-job topic. Each client
//! owns an unbounded queue drained by its WebSocket forwarder, so a slow
//! socket never blocks a broadcast.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use pptx_surgeon_types::ProgressEvent;
use tokio::sync::mpsc;

/// Process-local client identifier.
pub type ClientId = u64;

/// A connected client's outbound queue.
pub struct ClientConnection {
    pub tx: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
}

/// Shared set of connected clients.
pub struct BroadcastHub {
    next_id: AtomicU64,
    clients: DashMap<ClientId, ClientConnection>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            clients: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add a client. The receiver yields serialized events in emission order.
    pub fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(
            id,
            ClientConnection {
                tx,
                connected_at: Instant::now(),
            },
        );
        tracing::info!(client_id = id, clients = self.clients.len(), "Client connected");
        (id, rx)
    }

    /// Remove a client. Returns false if it was already gone.
    pub fn unregister(&self, id: ClientId) -> bool {
        match self.clients.remove(&id) {
            Some((_, conn)) => {
                tracing::info!(
                    client_id = id,
                    connected_secs = conn.connected_at.elapsed().as_secs(),
                    "Client disconnected"
                );
                true
            }
            None => false,
        }
    }

    /// Send an event to every client whose queue is still open.
    ///
    /// Closed queues are skipped; they are removed when their socket task
    /// unregisters. Returns how many clients the event was queued for.
    pub fn broadcast(&self, event: &ProgressEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize progress event");
                return 0;
            }
        };

        let mut delivered = 0;
        for entry in self.clients.iter() {
            if entry.tx.send(payload.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(client_id = *entry.key(), "Skipping closed client");
            }
        }
        tracing::trace!(kind = ?event.kind, delivered, "Broadcast progress event");
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
