#![warn(missing_docs)]

//! p2pmux-host: connection multiplexer and single-peer client over a transport.

/// Single-peer client.
pub mod client;
/// Bidirectional peer id / connection id mapping.
pub mod connection_table;
/// Upper-layer handlers and events.
pub mod event_types;
/// Multiplexing server.
pub mod server;
/// Time utilities for the host.
pub mod time;

mod notifications;

pub use client::Client;
pub use connection_table::ConnectionTable;
pub use event_types::{ChannelSink, ClientEvent, ClientHandler, ServerEvent, ServerHandler};
pub use server::Server;
pub use time::{Clock, SystemClock};
