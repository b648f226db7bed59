use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::domain::utils::id::ChannelId;

const DEFAULT_CHANNEL_CAPACITY: usize = 50;

/// In-process message channels between coordinators and workers.
///
/// Each channel is a bounded FIFO of raw string messages with the three
/// operations the messaging interface guarantees: non-destructive `peek`,
/// destructive `read`, and best-effort `try_write`. A full channel makes
/// the write a delivery failure, never a panic.
///
/// Cloning the bus clones the handle; all clones share the same queues.
#[derive(Debug, Clone)]
pub struct MessageBus {
    queues: Arc<Mutex<HashMap<ChannelId, VecDeque<String>>>>,
    next_id: Arc<AtomicU32>,
    capacity: usize,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl MessageBus {
    pub fn new(capacity_per_channel: usize) -> Self {
        MessageBus { queues: Arc::new(Mutex::new(HashMap::new())), next_id: Arc::new(AtomicU32::new(1)), capacity: capacity_per_channel }
    }

    /// Allocates a fresh channel id. Monotonic, never reused, so an entry's
    /// owner id stays unambiguous across the whole run.
    pub fn allocate(&self) -> ChannelId {
        ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Front message of the channel without consuming it.
    pub fn peek(&self, id: ChannelId) -> Option<String> {
        let queues = self.queues.lock().expect("bus mutex poisoned");
        queues.get(&id).and_then(|q| q.front().cloned())
    }

    /// Consumes and returns the front message of the channel.
    pub fn read(&self, id: ChannelId) -> Option<String> {
        let mut queues = self.queues.lock().expect("bus mutex poisoned");
        queues.get_mut(&id).and_then(|q| q.pop_front())
    }

    /// Appends a message. Fails with `DeliveryFailure` when the channel is
    /// at capacity; the caller decides whether that forces a replan.
    pub fn try_write(&self, id: ChannelId, message: String) -> Result<()> {
        let mut queues = self.queues.lock().expect("bus mutex poisoned");
        let queue = queues.entry(id).or_default();

        if queue.len() >= self.capacity {
            log::warn!("Channel {} is full ({} messages). Dropping write.", id, queue.len());
            return Err(Error::DeliveryFailure(id));
        }

        queue.push_back(message);
        Ok(())
    }

    /// Drops everything queued on a channel.
    pub fn clear(&self, id: ChannelId) {
        let mut queues = self.queues.lock().expect("bus mutex poisoned");
        if let Some(queue) = queues.get_mut(&id) {
            queue.clear();
        }
    }

    pub fn len(&self, id: ChannelId) -> usize {
        let queues = self.queues.lock().expect("bus mutex poisoned");
        queues.get(&id).map_or(0, |q| q.len())
    }

    pub fn is_empty(&self, id: ChannelId) -> bool {
        self.len(id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_consume_read_does() {
        let bus = MessageBus::default();
        let ch = bus.allocate();

        bus.try_write(ch, "first".to_string()).unwrap();
        bus.try_write(ch, "second".to_string()).unwrap();

        assert_eq!(bus.peek(ch).as_deref(), Some("first"));
        assert_eq!(bus.peek(ch).as_deref(), Some("first"), "peek must not remove the message");
        assert_eq!(bus.read(ch).as_deref(), Some("first"));
        assert_eq!(bus.read(ch).as_deref(), Some("second"));
        assert_eq!(bus.read(ch), None);
    }

    #[test]
    fn write_to_full_channel_is_a_delivery_failure() {
        let bus = MessageBus::new(2);
        let ch = bus.allocate();

        bus.try_write(ch, "a".into()).unwrap();
        bus.try_write(ch, "b".into()).unwrap();

        let result = bus.try_write(ch, "c".into());
        assert!(matches!(result, Err(Error::DeliveryFailure(id)) if id == ch));
        assert_eq!(bus.len(ch), 2);
    }

    #[test]
    fn allocated_ids_are_monotonic() {
        let bus = MessageBus::default();
        let a = bus.allocate();
        let b = bus.allocate();
        assert!(b > a);
    }
}
