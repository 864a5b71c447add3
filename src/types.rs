use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ConnectionId = String;
pub type RoomId = String;

/// Participant id is the id of the connection that joined
pub type ParticipantId = ConnectionId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ScrumMaster,
    ProductOwner,
    TeamMember,
    Observer,
}

impl Role {
    /// Whether this role may reveal/reset votes and drive the timer.
    ///
    /// Every gated action goes through this predicate.
    pub fn is_moderator(self) -> bool {
        matches!(self, Role::ScrumMaster | Role::ProductOwner)
    }

    /// Observers sit in the room but never count towards consensus
    pub fn is_voter(self) -> bool {
        self != Role::Observer
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotingState {
    #[default]
    Collecting,
    Revealed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    pub vote: Option<String>,
    pub has_voted: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, role: Role) -> Self {
        Self {
            id,
            name,
            role,
            vote: None,
            has_voted: false,
        }
    }

    pub fn cast(&mut self, token: String) {
        self.vote = Some(token);
        self.has_voted = true;
    }

    pub fn clear_vote(&mut self) {
        self.vote = None;
        self.has_voted = false;
    }
}

/// The item currently being estimated. Replaced wholesale, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// Advisory countdown bookkeeping. Clients run the actual countdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// ISO timestamp of the last start, cleared on reset
    pub started_at: Option<String>,
    /// Bumped on every start and reset
    pub epoch: u64,
}

// ========== Input limits ==========

pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_VOTE_CHARS: usize = 16;
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_ROOM_ID_CHARS: usize = 64;

/// Sentinel token for "no idea"
pub const UNKNOWN_VOTE: &str = "?";
