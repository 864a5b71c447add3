//! HTTP surface: the socket endpoint, room id minting and a room liveness check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::state::AppState;
use crate::types::RoomId;
use crate::ws;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
}

/// Whether a shared link still points at a live room. Deliberately carries
/// no names or votes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatus {
    pub room_id: RoomId,
    pub exists: bool,
    pub participants: usize,
}

/// Mint a fresh room id.
///
/// POST /api/rooms
///
/// The room itself only comes into existence when someone joins it.
pub async fn create_room(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CreatedRoom>) {
    let room_id = state.mint_room_id().await;
    tracing::debug!(
        "Minted room id {} ({} rooms live)",
        room_id,
        state.room_count().await
    );
    (StatusCode::CREATED, Json(CreatedRoom { room_id }))
}

/// GET /api/rooms/{room_id}
pub async fn room_status(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<RoomId>,
) -> Json<RoomStatus> {
    let participants = state.participant_count(&room_id).await;
    Json(RoomStatus {
        room_id,
        exists: participants.is_some(),
        participants: participants.unwrap_or(0),
    })
}

/// Full application router
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{room_id}", get(room_status))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
