use crate::broadcast::RoomChannel;
use crate::error::{RoomError, RoomResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use serde::Serialize;

/// One estimation room. Owned exclusively by the room store; everything
/// handed out of here is a copy.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    /// Join order, unique by participant id
    pub participants: Vec<Participant>,
    pub story: Option<Story>,
    pub state: VotingState,
    pub timer: TimerState,
    pub(crate) channel: RoomChannel,
}

/// Read-only copy of a room, votes included
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub participants: Vec<Participant>,
    pub story: Option<Story>,
    pub state: VotingState,
    pub timer: TimerState,
}

impl Room {
    pub fn new(id: RoomId, channel_capacity: usize) -> Self {
        Self {
            id,
            participants: Vec::new(),
            story: None,
            state: VotingState::Collecting,
            timer: TimerState::default(),
            channel: RoomChannel::new(channel_capacity),
        }
    }

    pub fn votes_revealed(&self) -> bool {
        self.state == VotingState::Revealed
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == *id)
    }

    fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == *id)
    }

    /// Add a participant, or update name and role in place if the connection
    /// is already in this room. An existing vote survives a rejoin.
    pub fn upsert_participant(&mut self, id: &ParticipantId, name: String, role: Role) -> Participant {
        match self.participant_mut(id) {
            Some(existing) => {
                existing.name = name;
                existing.role = role;
                existing.clone()
            }
            None => {
                let participant = Participant::new(id.clone(), name, role);
                self.participants.push(participant.clone());
                participant
            }
        }
    }

    pub fn remove_participant(&mut self, id: &ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == *id)?;
        Some(self.participants.remove(index))
    }

    /// Check that `id` is in this room with a moderator role
    pub fn authorize(&self, id: &ParticipantId, action: &'static str) -> RoomResult<&Participant> {
        let participant = self.participant(id).ok_or(RoomError::NotJoined)?;
        if !participant.role.is_moderator() {
            return Err(RoomError::Unauthorized(action));
        }
        Ok(participant)
    }

    /// Record a vote; a second vote before reveal overwrites the first
    pub fn submit_vote(&mut self, id: &ParticipantId, token: String) -> RoomResult<()> {
        let participant = self.participant_mut(id).ok_or(RoomError::NotJoined)?;
        participant.cast(token);
        Ok(())
    }

    pub fn reveal(&mut self) {
        self.state = VotingState::Revealed;
    }

    /// Clear every vote and go back to collecting
    pub fn reset_votes(&mut self) {
        for participant in &mut self.participants {
            participant.clear_vote();
        }
        self.state = VotingState::Collecting;
    }

    pub fn set_story(&mut self, story: Story) {
        self.story = Some(story);
    }

    pub fn start_timer(&mut self, started_at: String) -> u64 {
        self.timer.started_at = Some(started_at);
        self.timer.epoch += 1;
        self.timer.epoch
    }

    pub fn reset_timer(&mut self) -> u64 {
        self.timer.started_at = None;
        self.timer.epoch += 1;
        self.timer.epoch
    }

    /// A participant as other connections may see it: the vote is hidden
    /// until the room is revealed
    pub fn visible(&self, participant: &Participant) -> Participant {
        let mut view = participant.clone();
        if !self.votes_revealed() {
            view.vote = None;
        }
        view
    }

    pub fn visible_participants(&self) -> Vec<Participant> {
        self.participants.iter().map(|p| self.visible(p)).collect()
    }

    /// Full state for a connection that just joined
    pub fn joined_message(&self, participant_id: &ParticipantId) -> ServerMessage {
        ServerMessage::RoomJoined {
            room_id: self.id.clone(),
            participant_id: participant_id.clone(),
            participants: self.visible_participants(),
            story: self.story.clone(),
            votes_revealed: self.votes_revealed(),
            timer: self.timer.clone(),
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            participants: self.participants.clone(),
            story: self.story.clone(),
            state: self.state,
            timer: self.timer.clone(),
        }
    }
}
