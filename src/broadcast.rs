//! Room-scoped fan-out.
//!
//! Every room owns one `tokio::sync::broadcast` channel. Joining a room
//! subscribes the connection to that channel, so dispatch goes to the room's
//! group rather than iterating over connections. The channel lives and dies
//! with the room. A subscriber that falls behind the buffer is told how much
//! it missed rather than silently skipped, and resyncs from a room snapshot.

use crate::protocol::ServerMessage;
use crate::types::ConnectionId;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// A message dispatched to a room, optionally skipping one connection
#[derive(Debug)]
pub struct RoomEvent {
    pub exclude: Option<ConnectionId>,
    pub message: ServerMessage,
}

#[derive(Debug, Clone)]
pub struct RoomChannel {
    sender: broadcast::Sender<Arc<RoomEvent>>,
}

impl RoomChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self, connection_id: &ConnectionId) -> Subscription {
        Subscription {
            connection_id: connection_id.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    /// Send to every subscribed connection, sender included
    pub fn broadcast(&self, message: ServerMessage) {
        self.dispatch(RoomEvent {
            exclude: None,
            message,
        });
    }

    /// Send to everyone in the room except `connection_id`
    pub fn broadcast_except(&self, connection_id: &ConnectionId, message: ServerMessage) {
        self.dispatch(RoomEvent {
            exclude: Some(connection_id.clone()),
            message,
        });
    }

    fn dispatch(&self, event: RoomEvent) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// What a subscription yields: a room message, or notice that the connection
/// fell behind the channel buffer and missed `skipped` messages
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Message(ServerMessage),
    Lagged(u64),
}

/// One connection's view of a room channel
#[derive(Debug)]
pub struct Subscription {
    connection_id: ConnectionId,
    receiver: broadcast::Receiver<Arc<RoomEvent>>,
}

impl Subscription {
    fn is_for_me(&self, event: &RoomEvent) -> bool {
        event.exclude.as_ref() != Some(&self.connection_id)
    }

    fn lagged(&self, skipped: u64) -> Delivery {
        tracing::warn!(
            connection = %self.connection_id,
            skipped,
            "Room subscriber lagged, resync needed"
        );
        Delivery::Lagged(skipped)
    }

    /// Wait for the next delivery addressed to this connection.
    /// Returns None once the room is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.is_for_me(&event) => {
                    return Some(Delivery::Message(event.message.clone()))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => return Some(self.lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-queued delivery without waiting
    pub fn try_recv(&mut self) -> Option<Delivery> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.is_for_me(&event) => {
                    return Some(Delivery::Message(event.message.clone()))
                }
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => return Some(self.lagged(skipped)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
