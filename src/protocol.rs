use crate::consensus::Consensus;
use crate::error::{RoomError, RoomResult};
use crate::room_id;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "t",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        room_id: RoomId,
        name: String,
        role: Role,
    },
    SubmitVote {
        vote: String,
    },
    RevealVotes,
    ResetVoting {
        room_id: Option<RoomId>,
    },
    AddStory {
        title: String,
        description: Option<String>,
        link: Option<String>,
    },
    TimerStart {
        room_id: Option<RoomId>,
    },
    TimerReset {
        room_id: Option<RoomId>,
    },
}

impl ClientMessage {
    /// Trim and check every user-supplied field.
    ///
    /// Runs before anything reaches room state, so a rejected message never
    /// causes a partial mutation.
    pub fn validate(self) -> RoomResult<Self> {
        match self {
            ClientMessage::JoinRoom {
                room_id,
                name,
                role,
            } => {
                let room_id = room_id.trim().to_string();
                if !room_id::is_acceptable(&room_id) {
                    return Err(RoomError::InvalidPayload(format!(
                        "roomId must be 1-{} characters of A-Z, a-z, 0-9, '-' or '_'",
                        MAX_ROOM_ID_CHARS
                    )));
                }
                let name = required("name", &name, MAX_NAME_CHARS)?;
                Ok(ClientMessage::JoinRoom {
                    room_id,
                    name,
                    role,
                })
            }
            ClientMessage::SubmitVote { vote } => Ok(ClientMessage::SubmitVote {
                vote: required("vote", &vote, MAX_VOTE_CHARS)?,
            }),
            ClientMessage::AddStory {
                title,
                description,
                link,
            } => Ok(ClientMessage::AddStory {
                title: required("title", &title, MAX_TITLE_CHARS)?,
                description: optional(description),
                link: optional(link),
            }),
            other => Ok(other),
        }
    }
}

fn required(field: &str, value: &str, max_chars: usize) -> RoomResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RoomError::InvalidPayload(format!("{} is required", field)));
    }
    if value.chars().count() > max_chars {
        return Err(RoomError::InvalidPayload(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(value.to_string())
}

/// Blank optional text means "not provided"
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    tag = "t",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Unicast to a connection after it joins
    RoomJoined {
        room_id: RoomId,
        participant_id: ParticipantId,
        participants: Vec<Participant>,
        story: Option<Story>,
        votes_revealed: bool,
        timer: TimerState,
    },
    ParticipantJoined {
        participant: Participant,
    },
    ParticipantLeft {
        id: ParticipantId,
    },
    /// Never carries the vote itself
    VoteSubmitted {
        participant_id: ParticipantId,
        has_voted: bool,
    },
    VotesRevealed {
        participants: Vec<Participant>,
        consensus: Consensus,
    },
    VotingReset {
        participants: Vec<Participant>,
    },
    StoryAdded {
        story: Story,
    },
    TimerStarted {
        duration_secs: u32,
        started_at: String,
        epoch: u64,
    },
    TimerReset {
        room_id: RoomId,
        epoch: u64,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<&RoomError> for ServerMessage {
    fn from(err: &RoomError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}
