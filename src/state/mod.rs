mod registry;
mod room;
mod timer;
mod voting;

pub use registry::ConnectionRegistry;
pub use room::{Room, RoomSnapshot};

use crate::abuse::RateLimiter;
use crate::config::ServerConfig;
use crate::error::{RoomError, RoomResult};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state
///
/// `rooms` is the single authority for room data. Every transition takes its
/// write lock, mutates, and dispatches to the room channel before releasing
/// it, so two actions on a room never interleave their broadcasts. Lock order
/// is rooms, then connections.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    pub connections: ConnectionRegistry,
    pub config: Arc<ServerConfig>,
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            connections: ConnectionRegistry::new(),
            rate_limiter: RateLimiter::from_config(&config),
            config: Arc::new(config),
        }
    }

    /// Resolve the room a connection is acting in. When the action names a
    /// room explicitly it has to match the one the connection joined.
    async fn room_for(
        &self,
        connection_id: &ConnectionId,
        requested: Option<&RoomId>,
    ) -> RoomResult<RoomId> {
        let joined = self
            .connections
            .resolve(connection_id)
            .await
            .ok_or(RoomError::NotJoined)?;
        match requested {
            Some(requested) if *requested != joined => Err(RoomError::RoomMismatch {
                requested: requested.clone(),
                joined,
            }),
            _ => Ok(joined),
        }
    }

    /// Get a copy of a live room
    pub async fn get_room(&self, room_id: &str) -> Option<RoomSnapshot> {
        self.rooms.read().await.get(room_id).map(Room::snapshot)
    }

    pub async fn participant_count(&self, room_id: &str) -> Option<usize> {
        self.get_room(room_id)
            .await
            .map(|room| room.participants.len())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Mint an id no live room is using. The room itself is created by the
    /// first join.
    pub async fn mint_room_id(&self) -> RoomId {
        loop {
            let id = crate::room_id::generate();
            if !self.rooms.read().await.contains_key(&id) {
                break id;
            }
            // Collision - try again (extremely rare with 36^8 combinations)
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
