use std::collections::{HashMap, VecDeque};

use p2pmux_core::{
    channel::Channel,
    config::Config,
    error::ErrorKind,
    transport::{Transport, TransportState},
    types::{ConnectionId, PeerId},
};
use p2pmux_peer::{PeerAction, PeerConnection, PeerStatistics};
use tracing::{debug, error, info, warn};

use crate::{
    connection_table::ConnectionTable,
    event_types::ServerHandler,
    notifications::{Notification, NotificationQueue},
};

/// Multiplexes many peer connections over one transport.
///
/// Transport callbacks are captured into a queue at construction and handled on the
/// next `receive_data` tick, so every state change happens on the caller's thread.
pub struct Server<T: Transport, H: ServerHandler> {
    transport: T,
    handler: H,
    config: Config,
    table: ConnectionTable,
    peers: HashMap<ConnectionId, PeerConnection>,
    notifications: NotificationQueue,
    paused: bool,
    active: bool,
}

impl<T: Transport, H: ServerHandler> std::fmt::Debug for Server<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("peers", &self.peers)
            .field("paused", &self.paused)
            .field("active", &self.active)
            .finish()
    }
}

impl<T: Transport, H: ServerHandler> Server<T, H> {
    /// Creates a server and registers both transport callbacks.
    pub fn new(mut transport: T, handler: H, config: Config) -> Self {
        let notifications = NotificationQueue::new();
        notifications.register_connect_requests(&mut transport);
        notifications.register_state_changes(&mut transport);

        Server {
            transport,
            handler,
            table: ConnectionTable::new(config.max_connections),
            config,
            peers: HashMap::new(),
            notifications,
            paused: false,
            active: true,
        }
    }

    /// Handles a remote peer asking to connect.
    pub fn on_connect_request(&mut self, peer: PeerId) {
        if !self.active {
            return;
        }
        if self.table.lookup_by_peer(peer).is_some() {
            debug!("Ignoring duplicate connect request from {}", peer);
            return;
        }

        let connection = match self.table.add(peer) {
            Ok(connection) => connection,
            Err(err) => {
                warn!("Rejecting connect request from {}: {}", peer, err);
                return;
            }
        };

        info!("Accepting {} as connection {}", peer, connection);
        let mut record = PeerConnection::new(peer, &self.config);
        if self.paused {
            record.pause();
        }
        let actions = record.begin_accept();
        self.peers.insert(connection, record);
        self.apply(connection, actions);
    }

    /// Handles a session state change reported by the transport.
    pub fn on_state_changed(&mut self, peer: PeerId, state: TransportState) {
        if !self.active {
            return;
        }
        let Some(connection) = self.table.lookup_by_peer(peer) else {
            debug!("Ignoring {:?} for unknown peer {}", state, peer);
            return;
        };
        let actions = match self.peers.get_mut(&connection) {
            Some(record) => record.handle_transport_state(state),
            None => return,
        };
        self.apply(connection, actions);
    }

    /// Handles every queued transport callback.
    pub fn dispatch_notifications(&mut self) {
        while let Some(notification) = self.notifications.pop() {
            match notification {
                Notification::ConnectRequest(peer) => self.on_connect_request(peer),
                Notification::StateChanged(peer, state) => self.on_state_changed(peer, state),
            }
        }
    }

    /// Runs one tick: dispatches callbacks, then drains the transport's inbound queue.
    pub fn receive_data(&mut self) {
        if !self.active {
            return;
        }
        self.dispatch_notifications();

        while let Some(packet) = self.transport.poll_packet() {
            let Some(connection) = self.table.lookup_by_peer(packet.sender) else {
                warn!("Dropping packet: {}", ErrorKind::UnknownSender(packet.sender));
                continue;
            };
            let actions = match self.peers.get_mut(&connection) {
                Some(record) => record.receive(packet),
                None => continue,
            };
            self.apply(connection, actions);
        }

        self.dispatch_notifications();
    }

    /// Sends a payload on a connection. Returns false if it was not handed to the transport.
    pub fn send(&mut self, connection: ConnectionId, payload: &[u8], channel: Channel) -> bool {
        if !self.active {
            return false;
        }
        let Some(record) = self.peers.get_mut(&connection) else {
            self.handler.on_error(connection, ErrorKind::UnknownConnection(connection));
            return false;
        };

        match record.send(payload, channel) {
            Ok(actions) => {
                let transmitted = actions.iter().any(|a| matches!(a, PeerAction::Transmit { .. }));
                self.apply(connection, actions);
                transmitted && self.peers.contains_key(&connection)
            }
            Err(err) => {
                self.handler.on_error(connection, err);
                false
            }
        }
    }

    /// Closes a connection locally without waiting for the transport.
    pub fn disconnect(&mut self, connection: ConnectionId) -> bool {
        if !self.active {
            return false;
        }
        let actions = match self.peers.get_mut(&connection) {
            Some(record) => record.disconnect(),
            None => return false,
        };
        self.apply(connection, actions);
        true
    }

    /// Returns the peer id behind a connection as a string.
    pub fn client_address(&mut self, connection: ConnectionId) -> Option<String> {
        if !self.active {
            return None;
        }
        match self.table.lookup_by_connection(connection) {
            Some(peer) => Some(peer.to_string()),
            None => {
                self.handler.on_error(connection, ErrorKind::UnknownConnection(connection));
                None
            }
        }
    }

    /// Pauses delivery on every connection, including ones accepted later.
    pub fn pause(&mut self) {
        if !self.active {
            return;
        }
        self.paused = true;
        for record in self.peers.values_mut() {
            record.pause();
        }
    }

    /// Resumes delivery, draining each connection's buffer in arrival order.
    pub fn unpause(&mut self) {
        if !self.active || !self.paused {
            return;
        }
        self.paused = false;

        let mut connections: Vec<ConnectionId> = self.peers.keys().copied().collect();
        connections.sort();
        for connection in connections {
            let actions = match self.peers.get_mut(&connection) {
                Some(record) => record.unpause(),
                None => continue,
            };
            self.apply(connection, actions);
        }
    }

    /// Detaches from the transport and discards queued input.
    ///
    /// Live connections are left as they are; disconnect them beforehand for a graceful
    /// teardown.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.transport.clear_handlers();
        let notifications = self.notifications.clear();
        let packets = self.transport.discard_packets();
        info!(
            "Server shut down, discarded {} notifications and {} packets",
            notifications, packets
        );
    }

    /// Returns true until `shutdown` is called.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true while delivery is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Returns the connection id assigned to a peer.
    pub fn connection_for(&self, peer: PeerId) -> Option<ConnectionId> {
        self.table.lookup_by_peer(peer)
    }

    /// Returns the number of payloads buffered on a connection.
    pub fn pending_inbound(&self, connection: ConnectionId) -> Option<usize> {
        self.peers.get(&connection).map(PeerConnection::pending_len)
    }

    /// Returns the statistics of a connection.
    pub fn statistics(&self, connection: ConnectionId) -> Option<&PeerStatistics> {
        self.peers.get(&connection).map(PeerConnection::statistics)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the handler mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Returns the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn apply(&mut self, connection: ConnectionId, actions: Vec<PeerAction>) {
        let mut queue: VecDeque<PeerAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            let Some(record) = self.peers.get_mut(&connection) else {
                break;
            };
            let remote = record.remote();

            match action {
                PeerAction::Connect => self.transport.connect(remote),
                PeerAction::Accept => self.transport.accept(remote),
                PeerAction::Close => self.transport.close(remote),
                PeerAction::Transmit { payload, policy } => {
                    if self.transport.try_send(remote, &payload, policy) {
                        record.record_transmitted(payload.len());
                    } else {
                        error!("Transport refused a {} byte payload for {}", payload.len(), remote);
                        for follow_up in record.send_failed().into_iter().rev() {
                            queue.push_front(follow_up);
                        }
                    }
                }
                PeerAction::Connected => {
                    info!("Connection {} to {} is up", connection, remote);
                    self.handler.on_connected(connection);
                }
                PeerAction::Deliver { payload, channel } => {
                    self.handler.on_data_received(connection, &payload, channel);
                }
                PeerAction::Error(err) => self.handler.on_error(connection, err),
                PeerAction::Disconnected { was_connected } => {
                    self.peers.remove(&connection);
                    self.table.remove(connection);
                    info!("Connection {} to {} closed", connection, remote);
                    if was_connected {
                        self.handler.on_disconnected(connection);
                    }
                }
            }
        }
    }
}
