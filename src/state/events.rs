use tokio::sync::broadcast;

use crate::dto::ws::ServerMessage;

/// Default capacity of the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Fan-out hub feeding every WebSocket session and the public SSE stream.
pub struct EventHub {
    sender: broadcast::Sender<ServerMessage>,
}

impl EventHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, message: ServerMessage) {
        let _ = self.sender.send(message);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_later_events_only() {
        let hub = EventHub::new(4);
        hub.broadcast(ServerMessage::LockStatus { holder: None });

        let mut rx = hub.subscribe();
        hub.broadcast(ServerMessage::LockStatus { holder: None });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_name(), "control:lock:status");
        assert!(rx.try_recv().is_err());
    }
}
