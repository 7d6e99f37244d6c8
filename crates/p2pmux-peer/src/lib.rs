#![warn(missing_docs)]

//! p2pmux-peer: per-peer connection state machine.

/// Instructions returned by a connection for its owner to apply.
pub mod action;
mod connection;
mod peer_state;
/// Inbound buffering used before connect and while paused.
pub mod pending_queue;
/// Per-connection traffic counters.
pub mod statistics;

pub use action::PeerAction;
pub use connection::PeerConnection;
pub use peer_state::PeerConnectionState;
pub use pending_queue::{Enqueued, InboundPacket, PendingQueue};
pub use statistics::PeerStatistics;
