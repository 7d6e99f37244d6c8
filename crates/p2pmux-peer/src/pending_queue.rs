use std::collections::VecDeque;

use p2pmux_core::{
    channel::Channel,
    config::PendingOverflow,
    error::{ErrorKind, Result},
};

/// A payload waiting to be delivered to the upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    /// Opaque payload bytes
    pub payload: Vec<u8>,
    /// Channel the payload arrived on
    pub channel: Channel,
}

impl InboundPacket {
    /// Creates a new inbound packet.
    pub fn new(payload: Vec<u8>, channel: Channel) -> Self {
        Self { payload, channel }
    }
}

/// How a push into the pending queue was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The packet was appended.
    Queued,
    /// The packet was appended after evicting the oldest one.
    EvictedOldest,
    /// The queue was full and the packet was discarded.
    DroppedNewest,
}

/// FIFO of inbound payloads held back while a connection is not deliverable.
#[derive(Debug)]
pub struct PendingQueue {
    /// Buffered packets, oldest first
    packets: VecDeque<InboundPacket>,
    /// Max packets held (0 = unlimited)
    max_len: usize,
    /// What a push does once `max_len` is reached
    overflow: PendingOverflow,
    /// Largest length observed
    high_water: usize,
}

impl PendingQueue {
    /// Creates a queue holding at most `max_len` packets (0 = unlimited).
    pub fn new(max_len: usize, overflow: PendingOverflow) -> Self {
        Self { packets: VecDeque::new(), max_len, overflow, high_water: 0 }
    }

    /// Appends a packet, applying the overflow policy when the queue is full.
    ///
    /// Fails only under `PendingOverflow::Disconnect`, leaving the queue untouched.
    pub fn push(&mut self, packet: InboundPacket) -> Result<Enqueued> {
        let full = self.max_len != 0 && self.packets.len() >= self.max_len;
        let outcome = if !full {
            self.packets.push_back(packet);
            Enqueued::Queued
        } else {
            match self.overflow {
                PendingOverflow::DropOldest => {
                    self.packets.pop_front();
                    self.packets.push_back(packet);
                    Enqueued::EvictedOldest
                }
                PendingOverflow::DropNewest => Enqueued::DroppedNewest,
                PendingOverflow::Disconnect => {
                    return Err(ErrorKind::PendingOverflow { max: self.max_len })
                }
            }
        };
        self.high_water = self.high_water.max(self.packets.len());
        Ok(outcome)
    }

    /// Returns the number of queued packets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Returns the largest length the queue has reached.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Drains all packets in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = InboundPacket> + '_ {
        self.packets.drain(..)
    }

    /// Returns an iterator over the packets without draining.
    pub fn iter(&self) -> impl Iterator<Item = &InboundPacket> {
        self.packets.iter()
    }

    /// Clears all pending packets.
    pub fn clear(&mut self) {
        self.packets.clear();
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new(0, PendingOverflow::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(byte: u8) -> InboundPacket {
        InboundPacket::new(vec![byte], Channel::Reliable)
    }

    #[test]
    fn test_queue_basic_operations() {
        let mut queue = PendingQueue::new(3, PendingOverflow::Disconnect);

        assert!(queue.is_empty());
        assert_eq!(queue.push(packet(1)), Ok(Enqueued::Queued));
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_queue_drain_preserves_order() {
        let mut queue = PendingQueue::default();
        for i in 0..10 {
            queue.push(packet(i)).unwrap();
        }

        let drained: Vec<u8> = queue.drain().map(|p| p.payload[0]).collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
        assert!(queue.is_empty());
        assert_eq!(queue.high_water(), 10);
    }

    #[test]
    fn test_overflow_drop_oldest() {
        let mut queue = PendingQueue::new(2, PendingOverflow::DropOldest);
        queue.push(packet(1)).unwrap();
        queue.push(packet(2)).unwrap();
        assert_eq!(queue.push(packet(3)), Ok(Enqueued::EvictedOldest));

        let remaining: Vec<u8> = queue.iter().map(|p| p.payload[0]).collect();
        assert_eq!(remaining, vec![2, 3]);
    }

    #[test]
    fn test_overflow_drop_newest() {
        let mut queue = PendingQueue::new(2, PendingOverflow::DropNewest);
        queue.push(packet(1)).unwrap();
        queue.push(packet(2)).unwrap();
        assert_eq!(queue.push(packet(3)), Ok(Enqueued::DroppedNewest));

        let remaining: Vec<u8> = queue.iter().map(|p| p.payload[0]).collect();
        assert_eq!(remaining, vec![1, 2]);
    }

    #[test]
    fn test_overflow_disconnect() {
        let mut queue = PendingQueue::new(1, PendingOverflow::Disconnect);
        queue.push(packet(1)).unwrap();
        assert_eq!(queue.push(packet(2)), Err(ErrorKind::PendingOverflow { max: 1 }));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_unbounded_queue() {
        let mut queue = PendingQueue::new(0, PendingOverflow::Disconnect);
        for i in 0..=255 {
            assert_eq!(queue.push(packet(i)), Ok(Enqueued::Queued));
        }
        assert_eq!(queue.len(), 256);
    }
}
