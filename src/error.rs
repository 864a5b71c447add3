use crate::types::RoomId;

/// Errors produced by room actions
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    #[error("Connection has not joined a room")]
    NotJoined,

    #[error("Only a scrum master or product owner can {0}")]
    Unauthorized(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Action targets room {requested} but connection is in {joined}")]
    RoomMismatch { requested: RoomId, joined: RoomId },
}

impl RoomError {
    /// Wire code sent back in `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::NotJoined => "NOT_JOINED",
            RoomError::Unauthorized(_) => "UNAUTHORIZED",
            RoomError::InvalidPayload(_) => "INVALID_PAYLOAD",
            RoomError::RoomMismatch { .. } => "ROOM_MISMATCH",
        }
    }

    /// Whether the caller is told about this outcome. Actions from connections
    /// outside the targeted room are dropped without a reply.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            RoomError::Unauthorized(_) | RoomError::InvalidPayload(_)
        )
    }
}

pub type RoomResult<T> = Result<T, RoomError>;
