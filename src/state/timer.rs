//! Advisory countdown. The server only fans out start and reset; each client
//! runs its own countdown and nothing happens here when it expires.

use super::{AppState, Room};
use crate::error::{RoomError, RoomResult};
use crate::protocol::ServerMessage;
use crate::types::*;

impl AppState {
    /// Moderator only
    pub async fn start_timer(
        &self,
        connection_id: &ConnectionId,
        requested: Option<&RoomId>,
    ) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, requested).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        let name = room.authorize(connection_id, "start the timer")?.name.clone();
        let started_at = chrono::Utc::now().to_rfc3339();
        let epoch = room.start_timer(started_at.clone());
        room.channel.broadcast(ServerMessage::TimerStarted {
            duration_secs: self.config.timer_seconds,
            started_at,
            epoch,
        });

        tracing::info!("Timer started in room {} by {}", room_id, name);
        Ok(())
    }

    /// Moderator only. Fine to call whether or not a timer is running.
    pub async fn reset_timer(
        &self,
        connection_id: &ConnectionId,
        requested: Option<&RoomId>,
    ) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, requested).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        let name = room.authorize(connection_id, "reset the timer")?.name.clone();
        reset_timer_locked(room);

        tracing::info!("Timer reset in room {} by {}", room_id, name);
        Ok(())
    }
}

/// Reset and announce; caller holds the rooms lock
pub(super) fn reset_timer_locked(room: &mut Room) {
    let epoch = room.reset_timer();
    room.channel.broadcast(ServerMessage::TimerReset {
        room_id: room.id.clone(),
        epoch,
    });
}
