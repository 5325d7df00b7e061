//! Room registry backed by tokio broadcast channels.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

use super::ServerEvent;

/// Shared map of room name to broadcast sender. Cheap to clone.
#[derive(Clone)]
pub struct Hub {
    rooms: Arc<RwLock<HashMap<String, broadcast::Sender<ServerEvent>>>>,
    capacity: usize,
}

impl Hub {
    /// `capacity` is the number of events buffered per room before slow
    /// receivers start lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Send an event to everyone in `room`. Returns how many receivers got it;
    /// publishing to an empty or unknown room is not an error.
    pub fn publish(&self, room: &str, event: ServerEvent) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        match rooms.get(room) {
            Some(sender) => {
                let name = event.name();
                let delivered = sender.send(event).unwrap_or(0);
                tracing::debug!(room, event = name, delivered, "published");
                delivered
            }
            None => 0,
        }
    }

    /// Join `room`, creating it on first use.
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<ServerEvent> {
        if let Some(sender) = self
            .rooms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(room)
        {
            return sender.subscribe();
        }

        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop rooms nobody listens to. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - rooms.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn receiver_count(&self, room: &str) -> usize {
        self.rooms
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(room)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[tokio::test]
    async fn test_publish_reaches_room_members_only() {
        let hub = Hub::new(8);
        let mut a = hub.subscribe("user:a");
        let mut a2 = hub.subscribe("user:a");
        let mut b = hub.subscribe("user:b");

        assert_eq!(hub.publish("user:a", ServerEvent::Pong), 2);
        assert!(matches!(a.recv().await.unwrap(), ServerEvent::Pong));
        assert!(matches!(a2.recv().await.unwrap(), ServerEvent::Pong));
        assert!(matches!(b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_publish_to_missing_room() {
        let hub = Hub::new(8);
        assert_eq!(hub.publish("request:none", ServerEvent::Pong), 0);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn test_prune_drops_empty_rooms() {
        let hub = Hub::new(8);
        let kept = hub.subscribe("user:a");
        drop(hub.subscribe("user:b"));
        assert_eq!(hub.room_count(), 2);

        assert_eq!(hub.prune(), 1);
        assert_eq!(hub.room_count(), 1);
        assert_eq!(hub.receiver_count("user:a"), 1);
        // Publishing to a room whose receivers are gone delivers nothing.
        drop(kept);
        assert_eq!(hub.publish("user:a", ServerEvent::Pong), 0);
    }

    #[tokio::test]
    async fn test_slow_receiver_lags() {
        let hub = Hub::new(2);
        let mut rx = hub.subscribe("room");
        for _ in 0..5 {
            hub.publish("room", ServerEvent::Pong);
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert!(matches!(rx.recv().await.unwrap(), ServerEvent::Pong));
    }
}
