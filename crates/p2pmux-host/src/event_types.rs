//! Upper-layer event types.
//!
//! This module defines how the server and client report to the layer above:
//! - `ServerHandler` / `ClientHandler`: capability interfaces implemented by the consumer
//! - `ServerEvent` / `ClientEvent`: value forms of the same notifications
//! - `ChannelSink`: forwards events over a crossbeam channel

use crossbeam_channel::Sender;
use p2pmux_core::{channel::Channel, error::ErrorKind, types::ConnectionId};
use tracing::error;

/// Receives notifications from a `Server`.
pub trait ServerHandler {
    /// The connection is up. Fired once per connection.
    fn on_connected(&mut self, connection: ConnectionId);
    /// A payload arrived on the connection.
    fn on_data_received(&mut self, connection: ConnectionId, payload: &[u8], channel: Channel);
    /// The connection is gone. Fired once per connection that reported `on_connected`.
    fn on_disconnected(&mut self, connection: ConnectionId);
    /// Something went wrong for the connection.
    fn on_error(&mut self, connection: ConnectionId, error: ErrorKind);
}

/// Receives notifications from a `Client`.
pub trait ClientHandler {
    /// The connection to the server is up.
    fn on_connected(&mut self);
    /// A payload arrived from the server.
    fn on_data_received(&mut self, payload: &[u8], channel: Channel);
    /// The connect attempt or connection ended.
    fn on_disconnected(&mut self);
    /// Something went wrong with the connection.
    fn on_error(&mut self, error: ErrorKind);
}

/// Events emitted by a `Server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A connection was established.
    Connected(ConnectionId),
    /// A payload arrived.
    Data {
        /// Connection the payload arrived on
        connection: ConnectionId,
        /// Payload bytes
        payload: Vec<u8>,
        /// Channel the payload arrived on
        channel: Channel,
    },
    /// A connection was closed.
    Disconnected(ConnectionId),
    /// A connection-local error.
    Error(ConnectionId, ErrorKind),
}

/// Events emitted by a `Client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection to the server was established.
    Connected,
    /// A payload arrived.
    Data {
        /// Payload bytes
        payload: Vec<u8>,
        /// Channel the payload arrived on
        channel: Channel,
    },
    /// The connection ended.
    Disconnected,
    /// A connection error.
    Error(ErrorKind),
}

/// Handler that forwards every notification over a crossbeam `Sender`.
#[derive(Debug, Clone)]
pub struct ChannelSink<E>(Sender<E>);

impl<E> ChannelSink<E> {
    /// Wraps a sender.
    pub fn new(sender: Sender<E>) -> Self {
        Self(sender)
    }

    fn emit(&self, event: E) {
        if self.0.send(event).is_err() {
            error!("Event receiver dropped, discarding event");
        }
    }
}

impl ServerHandler for ChannelSink<ServerEvent> {
    fn on_connected(&mut self, connection: ConnectionId) {
        self.emit(ServerEvent::Connected(connection));
    }

    fn on_data_received(&mut self, connection: ConnectionId, payload: &[u8], channel: Channel) {
        self.emit(ServerEvent::Data { connection, payload: payload.to_vec(), channel });
    }

    fn on_disconnected(&mut self, connection: ConnectionId) {
        self.emit(ServerEvent::Disconnected(connection));
    }

    fn on_error(&mut self, connection: ConnectionId, error: ErrorKind) {
        self.emit(ServerEvent::Error(connection, error));
    }
}

impl ClientHandler for ChannelSink<ClientEvent> {
    fn on_connected(&mut self) {
        self.emit(ClientEvent::Connected);
    }

    fn on_data_received(&mut self, payload: &[u8], channel: Channel) {
        self.emit(ClientEvent::Data { payload: payload.to_vec(), channel });
    }

    fn on_disconnected(&mut self) {
        self.emit(ClientEvent::Disconnected);
    }

    fn on_error(&mut self, error: ErrorKind) {
        self.emit(ClientEvent::Error(error));
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    #[test]
    fn test_channel_sink_forwards_server_events() {
        let (sender, receiver) = unbounded();
        let mut sink = ChannelSink::new(sender);
        let id = ConnectionId::new(3);

        ServerHandler::on_connected(&mut sink, id);
        ServerHandler::on_data_received(&mut sink, id, &[1, 2], Channel::Unreliable);
        ServerHandler::on_disconnected(&mut sink, id);

        let events: Vec<ServerEvent> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ServerEvent::Connected(id),
                ServerEvent::Data { connection: id, payload: vec![1, 2], channel: Channel::Unreliable },
                ServerEvent::Disconnected(id),
            ]
        );
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sender, receiver) = unbounded::<ClientEvent>();
        let mut sink = ChannelSink::new(sender);
        drop(receiver);
        ClientHandler::on_connected(&mut sink);
    }
}
