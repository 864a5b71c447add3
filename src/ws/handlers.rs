//! WebSocket message dispatch
//!
//! Decodes and validates client frames, then hands them to the room state
//! machine. Authorization happens in the state layer against the caller's
//! role in its room.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Story;
use std::sync::Arc;

use super::Session;

/// Handle one raw text frame: rate limit, decode, dispatch
pub async fn handle_text(
    text: &str,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    if let Some(limiter) = &state.rate_limiter {
        if !limiter.check(&session.id).await {
            tracing::warn!("Rate limited connection {}", session.id);
            return Some(ServerMessage::Error {
                code: "RATE_LIMITED".to_string(),
                msg: "Too many actions, slow down".to_string(),
            });
        }
    }

    tracing::debug!("Received {} bytes from {}", text.len(), session.id);

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_message(msg, session, state).await,
        Err(e) => {
            tracing::error!("Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            })
        }
    }
}

/// Handle client messages and return optional unicast response.
/// Everything else a connection sees arrives through its room subscription.
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let msg = match msg.validate() {
        Ok(msg) => msg,
        Err(e) => return reply_for(e),
    };
    let id = session.id.clone();

    let result = match msg {
        ClientMessage::JoinRoom {
            room_id,
            name,
            role,
        } => {
            let (joined, subscription) = state.join_room(&id, room_id, name, role).await;
            session.subscribe(subscription);
            return Some(joined);
        }

        ClientMessage::SubmitVote { vote } => state.submit_vote(&id, vote).await,

        ClientMessage::RevealVotes => state.reveal_votes(&id).await,

        ClientMessage::ResetVoting { room_id } => state.reset_voting(&id, room_id.as_ref()).await,

        ClientMessage::AddStory {
            title,
            description,
            link,
        } => {
            let story = Story {
                title,
                description,
                link,
            };
            state.add_story(&id, story).await
        }

        ClientMessage::TimerStart { room_id } => state.start_timer(&id, room_id.as_ref()).await,

        ClientMessage::TimerReset { room_id } => state.reset_timer(&id, room_id.as_ref()).await,
    };

    match result {
        Ok(()) => None,
        Err(e) => reply_for(e),
    }
}

/// Unauthorized and malformed actions get an error back; actions from
/// connections outside the room are dropped quietly
fn reply_for(err: RoomError) -> Option<ServerMessage> {
    if err.is_reported() {
        tracing::info!("Rejected action: {}", err);
        Some(ServerMessage::from(&err))
    } else {
        tracing::debug!("Ignored action: {}", err);
        None
    }
}
