#![warn(missing_docs)]

//! p2pmux-core: foundational types shared by every layer.
//!
//! This crate provides the minimal set of pieces the peer and host layers build on:
//! - Configuration types
//! - Error handling
//! - Identifier newtypes (`PeerId`, `ConnectionId`)
//! - Channel policy translation
//! - The transport boundary trait and an in-memory emulator
//!
//! The per-peer state machine lives in `p2pmux-peer`; connection tables, the
//! multiplexing server and the single-peer client live in `p2pmux-host`.

/// Protocol constants shared across layers.
pub mod constants {
    /// Largest payload accepted on the reliable channel.
    pub const RELIABLE_MAX_MESSAGE_SIZE: usize = 65535;
    /// Largest payload accepted on the unreliable channel.
    pub const UNRELIABLE_MAX_MESSAGE_SIZE: usize = 1200;
    /// Default number of simultaneous connections a server accepts.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 16;
    /// Default bound on packets buffered per connection while not deliverable (0 = unlimited).
    pub const DEFAULT_MAX_PENDING_PACKETS: usize = 0;
    /// Default interval between liveness pings issued by a client, in milliseconds.
    pub const DEFAULT_PING_INTERVAL_MS: u64 = 300;
    /// Number of reconnect attempts made after a transport timeout before closing.
    pub const DEFAULT_TIMEOUT_RETRIES: u8 = 1;
    /// First connection id handed out by a server.
    pub const FIRST_CONNECTION_ID: u32 = 1;
}

/// Logical channels and their native send policies.
pub mod channel;
/// Configuration options for servers and clients.
pub mod config;
/// In-memory transport used by tests and demos.
pub mod emulator;
/// Error types and results.
pub mod error;
/// Transport abstraction for the wrapped peer-to-peer network.
pub mod transport;
/// Peer and connection identifiers.
pub mod types;

pub use channel::{Channel, SendPolicy};
pub use config::{Config, PendingOverflow};
pub use error::{ErrorKind, Result};
pub use transport::{Packet, Transport, TransportState};
pub use types::{ConnectionId, PeerId};
