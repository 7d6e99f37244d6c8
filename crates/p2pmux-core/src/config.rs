use std::{default::Default, time::Duration};

use crate::constants::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_PENDING_PACKETS, DEFAULT_PING_INTERVAL_MS,
    DEFAULT_TIMEOUT_RETRIES,
};

/// What to do when a connection's pending inbound queue is full.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum PendingOverflow {
    /// Evict the oldest queued packet to make room.
    DropOldest,
    /// Discard the packet that did not fit.
    DropNewest,
    /// Treat the overflow as fatal and close the connection.
    #[default]
    Disconnect,
}

#[derive(Clone, Debug)]
/// Configuration options shared by servers, clients and their peer connections.
pub struct Config {
    /// Max number of simultaneous connections a server registers.
    pub max_connections: usize,
    /// Max packets buffered per connection before it is deliverable (0 = unlimited).
    pub max_pending_packets: usize,
    /// Policy applied when `max_pending_packets` is reached.
    pub pending_overflow: PendingOverflow,
    /// Reconnect attempts after consecutive transport timeouts before closing.
    pub timeout_retries: u8,
    /// Interval between client liveness pings. None disables pings.
    pub ping_interval: Option<Duration>,
}

impl Config {
    /// Returns the default configuration with a different connection limit.
    pub fn with_max_connections(max_connections: usize) -> Self {
        Self { max_connections, ..Self::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_pending_packets: DEFAULT_MAX_PENDING_PACKETS,
            pending_overflow: PendingOverflow::Disconnect,
            timeout_retries: DEFAULT_TIMEOUT_RETRIES,
            ping_interval: Some(Duration::from_millis(DEFAULT_PING_INTERVAL_MS)),
        }
    }
}
