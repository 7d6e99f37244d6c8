//! Peer connection statistics tracking.
//!
//! Counters for traffic through a single connection, plus the observability hooks for
//! the pending inbound queue and the client's liveness pings.

use std::time::Duration;

/// Statistics for a peer connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerStatistics {
    /// Payloads successfully handed to the transport
    pub packets_sent: u64,
    /// Payloads received from the transport, including ones later buffered or dropped
    pub packets_received: u64,
    /// Payloads delivered to the upper layer
    pub packets_delivered: u64,
    /// Payload bytes successfully handed to the transport
    pub bytes_sent: u64,
    /// Payload bytes received from the transport
    pub bytes_received: u64,
    /// Unreliable payloads discarded because the connection was paused
    pub unreliable_dropped: u64,
    /// Buffered payloads lost to the pending queue overflow policy
    pub pending_dropped: u64,
    /// Largest length the pending inbound queue reached
    pub pending_high_water: usize,
    /// Transport timeouts observed over the record's lifetime
    pub timeouts: u64,
    /// Round-trip time of the last successful ping
    pub last_ping_rtt: Option<Duration>,
    /// Pings that failed or timed out
    pub ping_failures: u64,
}

impl PeerStatistics {
    /// Records the outcome of a liveness ping.
    pub fn record_ping(&mut self, rtt: Option<Duration>) {
        match rtt {
            Some(rtt) => self.last_ping_rtt = Some(rtt),
            None => self.ping_failures += 1,
        }
    }

    /// Resets all statistics counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
