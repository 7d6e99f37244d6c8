#![warn(missing_docs)]

//! p2pmux: a small public API facade for the workspace.
//!
//! This crate re-exports what an application needs to multiplex connections over a
//! peer-id addressed datagram transport:
//!
//! - Server and client (`Server`, `Client`) with their handler traits and events
//! - Channels and their limits (`Channel`, `max_packet_size`)
//! - Core configuration (`Config`)
//! - The transport boundary (`Transport`) and an in-memory `EmulatedNetwork`
//!
//! Example
//! ```
//! use crossbeam_channel::unbounded;
//! use p2pmux::prelude::*;
//!
//! let network = EmulatedNetwork::new();
//! let server_id = PeerId::new(1).unwrap();
//! let client_id = PeerId::new(2).unwrap();
//!
//! let (server_tx, server_rx) = unbounded();
//! let mut server =
//!     Server::new(network.transport(server_id), ChannelSink::new(server_tx), Config::default());
//! let (client_tx, _client_rx) = unbounded();
//! let mut client =
//!     Client::new(network.transport(client_id), ChannelSink::new(client_tx), Config::default());
//!
//! client.connect(&server_id.to_string());
//! server.receive_data();
//! client.receive_data();
//! assert!(client.send(b"hello", Channel::Reliable));
//!
//! server.receive_data();
//! let events: Vec<ServerEvent> = server_rx.try_iter().collect();
//! assert!(matches!(events.last(), Some(ServerEvent::Data { payload, .. }) if payload == b"hello"));
//! ```

// Core types and configuration
pub use p2pmux_core::{
    channel::{Channel, SendPolicy},
    config::{Config, PendingOverflow},
    emulator::{EmulatedNetwork, EmulatedTransport},
    error::{ErrorKind, Result},
    transport::{Packet, Transport, TransportState},
    types::{ConnectionId, PeerId},
};
// Host: server, client and their events
pub use p2pmux_host::{
    ChannelSink, Client, ClientEvent, ClientHandler, Clock, Server, ServerEvent, ServerHandler,
    SystemClock,
};
// Peer: connection state and counters
pub use p2pmux_peer::{PeerConnectionState, PeerStatistics};

/// Returns the largest payload accepted on a channel.
pub fn max_packet_size(channel: Channel) -> usize {
    channel.max_payload_size()
}

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        max_packet_size, Channel, ChannelSink, Client, ClientEvent, ClientHandler, Config,
        ConnectionId, EmulatedNetwork, ErrorKind, PeerId, Server, ServerEvent, ServerHandler,
        Transport, TransportState,
    };
}
