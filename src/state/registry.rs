use crate::types::{ConnectionId, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Which room each live connection is in. Holds room ids only, never
/// participant data, so deleting a room can't leave anything dangling here.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ConnectionId, RoomId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a connection at a room, returning the room it was in before
    pub async fn associate(&self, connection_id: &ConnectionId, room_id: RoomId) -> Option<RoomId> {
        self.inner
            .write()
            .await
            .insert(connection_id.clone(), room_id)
    }

    pub async fn resolve(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.inner.read().await.get(connection_id).cloned()
    }

    pub async fn forget(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.inner.write().await.remove(connection_id)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
