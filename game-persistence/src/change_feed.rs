use dashmap::DashMap;
use game_types::{RoomChange, RoomId};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Per-room broadcast channels announcing row changes
pub struct ChangeFeed {
    channels: DashMap<RoomId, broadcast::Sender<RoomChange>>,
    capacity: usize,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<RoomChange> {
        self.channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn notify(&self, room_id: RoomId, change: RoomChange) {
        let delivered = match self.channels.get(&room_id) {
            Some(sender) => sender.send(change).is_ok(),
            None => return,
        };

        if !delivered {
            // Every receiver is gone
            self.channels
                .remove_if(&room_id, |_, sender| sender.receiver_count() == 0);
        }
    }

    /// Drop the room's channel, ending every subscription to it
    pub fn close(&self, room_id: RoomId) {
        self.channels.remove(&room_id);
    }

    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.channels
            .get(&room_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
