pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;

use crate::broadcast::{Delivery, Subscription};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::ConnectionId;

/// Per-connection state: the connection's id and its room subscription
#[derive(Debug)]
pub struct Session {
    pub id: ConnectionId,
    subscription: Option<Subscription>,
    /// Set when the subscription lagged and a snapshot is still owed
    resync_pending: bool,
}

impl Session {
    /// New connection with a fresh, never reused id
    pub fn new() -> Self {
        Self::with_id(ulid::Ulid::new().to_string())
    }

    pub fn with_id(id: ConnectionId) -> Self {
        Self {
            id,
            subscription: None,
            resync_pending: false,
        }
    }

    /// Switch to a new room channel, dropping any previous one
    pub fn subscribe(&mut self, subscription: Subscription) {
        self.subscription = Some(subscription);
        self.resync_pending = false;
    }

    #[cfg(test)]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Swap the lagged subscription for a fresh one and return the room
    /// snapshot to send in place of the missed messages. The flag is only
    /// cleared once the swap is done, so a cancelled call is retried by the
    /// next one.
    async fn resync(&mut self, state: &AppState) -> Option<ServerMessage> {
        let resynced = state.resync(&self.id).await;
        self.resync_pending = false;
        match resynced {
            Some((snapshot, subscription)) => {
                self.subscription = Some(subscription);
                Some(snapshot)
            }
            None => {
                self.subscription = None;
                None
            }
        }
    }

    /// Next room broadcast for this connection. Pends forever while the
    /// connection isn't in a room.
    pub async fn next_event(&mut self, state: &AppState) -> ServerMessage {
        loop {
            if self.resync_pending {
                match self.resync(state).await {
                    Some(snapshot) => return snapshot,
                    None => continue,
                }
            }
            let Some(subscription) = self.subscription.as_mut() else {
                return std::future::pending().await;
            };
            match subscription.recv().await {
                Some(Delivery::Message(msg)) => return msg,
                Some(Delivery::Lagged(_)) => self.resync_pending = true,
                None => self.subscription = None,
            }
        }
    }

    /// Everything already queued for this connection. A lag shows up as a
    /// fresh room snapshot.
    pub async fn drain(&mut self, state: &AppState) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        loop {
            if self.resync_pending {
                messages.extend(self.resync(state).await);
            }
            let Some(subscription) = self.subscription.as_mut() else {
                return messages;
            };
            match subscription.try_recv() {
                Some(Delivery::Message(msg)) => messages.push(msg),
                Some(Delivery::Lagged(_)) => self.resync_pending = true,
                None => return messages,
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    tracing::info!("New client connected: {}", session.id);

    loop {
        tokio::select! {
            // Room broadcasts
            event = session.next_event(&state) => {
                if send(&mut sender, &event).await.is_err() {
                    break;
                }
            }

            // Client messages, handled one at a time in receipt order
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(response) =
                            handlers::handle_text(text.as_str(), &mut session, &state).await
                        {
                            if send(&mut sender, &response).await.is_err() {
                                tracing::error!("Failed to send response to {}", session.id);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed by {}", session.id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error on {}: {}", session.id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(room_id) = state.disconnect(&session.id).await {
        tracing::debug!("{} removed from room {}", session.id, room_id);
    }
    if let Some(limiter) = &state.rate_limiter {
        limiter.forget(&session.id).await;
    }

    tracing::info!("Client disconnected: {}", session.id);
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            Ok(())
        }
    }
}
