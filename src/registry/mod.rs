use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;

use crate::ws::ServerMessage;

/// Sequential identifier handed to each accepted connection
pub type ConnectionId = u64;

/// A peer that cannot drain its channel within this window is treated as gone
const SEND_TIMEOUT_MS: u64 = 5000;

/// Handle for a single WebSocket connection
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::Sender<ServerMessage>,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    fn new(id: ConnectionId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            sender,
            connected_at: Utc::now(),
        }
    }

    pub async fn send(
        &self,
        message: ServerMessage,
    ) -> Result<(), mpsc::error::SendError<ServerMessage>> {
        self.sender.send(message).await
    }
}

/// Result of a broadcast pass over the live set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastOutcome {
    pub attempted: usize,
    pub delivered: usize,
    pub pruned: usize,
}

/// Tracks all open WebSocket connections for one server instance.
///
/// Connections are keyed by a monotonically increasing id, so iteration
/// order over the map is registration order. Shared via `Arc` in app state.
pub struct ConnectionRegistry {
    /// connection_id -> ConnectionHandle, in registration order
    connections: RwLock<BTreeMap<ConnectionId, Arc<ConnectionHandle>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new connection and greet it.
    ///
    /// The welcome frame carries the assigned id; if the peer is already
    /// gone by the time it is sent, the connection is dropped again and
    /// `None` is returned.
    pub async fn register(
        &self,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Option<Arc<ConnectionHandle>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ConnectionHandle::new(id, sender));

        let total = {
            let mut connections = self.connections.write().await;
            connections.insert(id, handle.clone());
            connections.len()
        };

        if !deliver(&handle, ServerMessage::welcome(id)).await {
            self.connections.write().await.remove(&id);
            tracing::debug!(connection_id = id, "peer gone before welcome, dropped");
            return None;
        }

        tracing::info!(connection_id = id, total_connections = total, "Connection registered");
        Some(handle)
    }

    /// Unregister a connection; does nothing if it is already gone
    pub async fn unregister(&self, connection_id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&connection_id);
        match removed {
            Some(_) => {
                tracing::info!(connection_id, "Connection unregistered");
                true
            }
            None => false,
        }
    }

    /// Send a payload to a single connection.
    ///
    /// Returns `false` if the connection is unknown or the send fails; a
    /// failed send unregisters the connection.
    pub async fn send_to(&self, connection_id: ConnectionId, message: ServerMessage) -> bool {
        let handle = self.connections.read().await.get(&connection_id).cloned();
        let Some(handle) = handle else {
            return false;
        };

        if deliver(&handle, message).await {
            true
        } else {
            tracing::warn!(connection_id, "Send failed, dropping connection");
            self.unregister(connection_id).await;
            false
        }
    }

    /// Send a payload to every registered connection, best-effort.
    ///
    /// Works over a snapshot of the live set so a concurrent register or
    /// unregister never blocks the pass. Every connection is attempted even
    /// when earlier ones fail; failed connections are removed afterwards.
    pub async fn broadcast(&self, message: ServerMessage) -> BroadcastOutcome {
        let snapshot: Vec<Arc<ConnectionHandle>> =
            self.connections.read().await.values().cloned().collect();

        let mut outcome = BroadcastOutcome {
            attempted: snapshot.len(),
            ..BroadcastOutcome::default()
        };
        let mut failed = Vec::new();

        for handle in &snapshot {
            if deliver(handle, message.clone()).await {
                outcome.delivered += 1;
            } else {
                failed.push(handle.id);
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &failed {
                connections.remove(id);
            }
            outcome.pruned = failed.len();
            tracing::info!(pruned = ?failed, "Dropped unreachable connections after broadcast");
        }

        outcome
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Live connection ids in registration order
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn deliver(handle: &ConnectionHandle, message: ServerMessage) -> bool {
    matches!(
        timeout(Duration::from_millis(SEND_TIMEOUT_MS), handle.send(message)).await,
        Ok(Ok(()))
    )
}
