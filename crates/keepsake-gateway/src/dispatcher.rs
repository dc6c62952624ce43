use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use keepsake_types::events::StoreEvent;

/// Fans change notices out to every live query and tracks who is connected.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for change notices. Every live query receives all of them
    broadcast_tx: broadcast::Sender<StoreEvent>,

    /// Open gateway connections: conn_id -> email
    connections: RwLock<HashMap<Uuid, String>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to change notices. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Notify every live query. Having no listeners is fine.
    pub fn broadcast(&self, event: StoreEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Record a new gateway connection. Returns its conn_id.
    pub async fn connection_opened(&self, email: &str) -> Uuid {
        let conn_id = Uuid::new_v4();
        self.inner
            .connections
            .write()
            .await
            .insert(conn_id, email.to_string());
        conn_id
    }

    pub async fn connection_closed(&self, conn_id: Uuid) {
        self.inner.connections.write().await.remove(&conn_id);
    }

    /// Number of open gateway connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
