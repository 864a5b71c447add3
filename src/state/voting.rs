//! Room lifecycle and the vote state machine

use super::{AppState, Room};
use crate::broadcast::Subscription;
use crate::consensus;
use crate::error::{RoomError, RoomResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;

impl AppState {
    /// Join (creating on demand) a room.
    ///
    /// Returns the snapshot for the joiner and its subscription to the room
    /// channel. The subscription and the connection's association are both in
    /// place before this returns, so actions sent right after the join resolve
    /// and every later broadcast reaches the joiner.
    pub async fn join_room(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        name: String,
        role: Role,
    ) -> (ServerMessage, Subscription) {
        let mut rooms = self.rooms.write().await;

        if let Some(previous) = self.connections.resolve(connection_id).await {
            if previous != room_id {
                leave_room(&mut rooms, &previous, connection_id);
            }
        }

        let capacity = self.config.room_channel_capacity;
        let room = rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room {} created", room_id);
            Room::new(room_id.clone(), capacity)
        });

        let participant = room.upsert_participant(connection_id, name, role);
        let subscription = room.channel.subscribe(connection_id);
        room.channel.broadcast_except(
            connection_id,
            ServerMessage::ParticipantJoined {
                participant: room.visible(&participant),
            },
        );

        self.connections
            .associate(connection_id, room_id.clone())
            .await;

        tracing::info!(
            "{} joined room {} as {:?} ({} present, {} listening)",
            participant.name,
            room_id,
            participant.role,
            room.participants.len(),
            room.channel.subscriber_count()
        );

        (room.joined_message(connection_id), subscription)
    }

    /// Record a vote. Everyone in the room, the voter included, learns that
    /// a vote exists but never its value.
    pub async fn submit_vote(&self, connection_id: &ConnectionId, vote: String) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, None).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        room.submit_vote(connection_id, vote)?;
        room.channel.broadcast(ServerMessage::VoteSubmitted {
            participant_id: connection_id.clone(),
            has_voted: true,
        });

        tracing::debug!("Participant {} voted in room {}", connection_id, room_id);
        Ok(())
    }

    /// Moderator only. Revealing twice just re-broadcasts the current votes.
    pub async fn reveal_votes(&self, connection_id: &ConnectionId) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, None).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        room.authorize(connection_id, "reveal votes")?;
        room.reveal();
        room.channel.broadcast(ServerMessage::VotesRevealed {
            participants: room.participants.clone(),
            consensus: consensus::calculate(&room.participants),
        });

        tracing::info!("Votes revealed in room {}", room_id);
        Ok(())
    }

    /// Moderator only. Clears every vote and resets the shared countdown in
    /// the same locked section.
    pub async fn reset_voting(
        &self,
        connection_id: &ConnectionId,
        requested: Option<&RoomId>,
    ) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, requested).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        room.authorize(connection_id, "reset voting")?;
        room.reset_votes();
        room.channel.broadcast(ServerMessage::VotingReset {
            participants: room.visible_participants(),
        });
        super::timer::reset_timer_locked(room);

        tracing::info!("Voting reset in room {}", room_id);
        Ok(())
    }

    /// Any participant may replace the room's story
    pub async fn add_story(&self, connection_id: &ConnectionId, story: Story) -> RoomResult<()> {
        let room_id = self.room_for(connection_id, None).await?;
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id).ok_or(RoomError::NotJoined)?;

        if room.participant(connection_id).is_none() {
            return Err(RoomError::NotJoined);
        }
        room.set_story(story.clone());
        room.channel.broadcast(ServerMessage::StoryAdded { story });

        tracing::info!("Story added to room {}", room_id);
        Ok(())
    }

    /// Drop a connection. Returns the room it left, if any.
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        let mut rooms = self.rooms.write().await;
        let room_id = self.connections.forget(connection_id).await?;
        leave_room(&mut rooms, &room_id, connection_id);
        Some(room_id)
    }

    /// Fresh snapshot and subscription for a connection that fell behind its
    /// room channel. Both are taken under the same lock, so the new
    /// subscription starts exactly where the snapshot ends. None once the
    /// connection is no longer in a room.
    pub async fn resync(
        &self,
        connection_id: &ConnectionId,
    ) -> Option<(ServerMessage, Subscription)> {
        let room_id = self.connections.resolve(connection_id).await?;
        let rooms = self.rooms.read().await;
        let room = rooms.get(&room_id)?;
        room.participant(connection_id)?;

        tracing::debug!("Resyncing {} in room {}", connection_id, room_id);
        Some((
            room.joined_message(connection_id),
            room.channel.subscribe(connection_id),
        ))
    }
}

/// Remove a participant from a room the caller already holds the lock on.
/// The last one out deletes the room on the spot.
fn leave_room(rooms: &mut HashMap<RoomId, Room>, room_id: &RoomId, connection_id: &ConnectionId) {
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    let Some(participant) = room.remove_participant(connection_id) else {
        return;
    };

    tracing::info!("{} left room {}", participant.name, room_id);

    if room.is_empty() {
        rooms.remove(room_id);
        tracing::info!("Room {} removed", room_id);
    } else {
        room.channel.broadcast_except(
            connection_id,
            ServerMessage::ParticipantLeft {
                id: connection_id.clone(),
            },
        );
    }
}
