use std::{collections::VecDeque, sync::Arc, time::Instant};

use p2pmux_core::{
    channel::Channel,
    config::Config,
    error::ErrorKind,
    transport::{Transport, TransportState},
    types::PeerId,
};
use p2pmux_peer::{PeerAction, PeerConnection, PeerStatistics};
use tracing::{debug, error, info, warn};

use crate::{
    event_types::ClientHandler,
    notifications::{Notification, NotificationQueue},
    time::{Clock, SystemClock},
};

/// Connection to exactly one remote peer.
pub struct Client<T: Transport, H: ClientHandler> {
    transport: T,
    handler: H,
    config: Config,
    connection: Option<PeerConnection>,
    notifications: NotificationQueue,
    clock: Arc<dyn Clock>,
    last_ping: Option<Instant>,
    paused: bool,
    active: bool,
}

impl<T: Transport, H: ClientHandler> std::fmt::Debug for Client<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("connection", &self.connection)
            .field("last_ping", &self.last_ping)
            .field("paused", &self.paused)
            .field("active", &self.active)
            .finish()
    }
}

impl<T: Transport, H: ClientHandler> Client<T, H> {
    /// Creates an idle client using the system clock for pings.
    pub fn new(transport: T, handler: H, config: Config) -> Self {
        Self::with_clock(transport, handler, config, Arc::new(SystemClock))
    }

    /// Creates an idle client with a custom clock.
    pub fn with_clock(transport: T, handler: H, config: Config, clock: Arc<dyn Clock>) -> Self {
        Client {
            transport,
            handler,
            config,
            connection: None,
            notifications: NotificationQueue::new(),
            clock,
            last_ping: None,
            paused: false,
            active: true,
        }
    }

    /// Returns true if `candidate` is a well-formed peer id.
    pub fn can_parse_id(&self, candidate: &str) -> bool {
        candidate.parse::<PeerId>().is_ok()
    }

    /// Starts connecting to the peer whose id is given as a string.
    pub fn connect(&mut self, address: &str) {
        if !self.active {
            return;
        }
        if let Some(connection) = &self.connection {
            warn!(
                "Connect to {} ignored, connection to {} is {:?}",
                address,
                connection.remote(),
                connection.state()
            );
            return;
        }

        let remote = match address.parse::<PeerId>() {
            Ok(remote) => remote,
            Err(err) => {
                error!("Cannot connect: {}", err);
                self.handler.on_error(err);
                self.handler.on_disconnected();
                return;
            }
        };

        let stale = self.transport.discard_packets() + self.notifications.clear();
        if stale > 0 {
            debug!("Discarded {} stale packets and notifications before connecting", stale);
        }
        self.notifications.register_state_changes(&mut self.transport);

        info!("Connecting to {}", remote);
        let mut connection = PeerConnection::new(remote, &self.config);
        if self.paused {
            connection.pause();
        }
        let actions = connection.begin_connect();
        self.connection = Some(connection);
        self.last_ping = None;
        self.apply(actions);
    }

    /// Handles a session state change reported by the transport.
    pub fn on_state_changed(&mut self, peer: PeerId, state: TransportState) {
        if !self.active {
            return;
        }
        let actions = match self.connection.as_mut() {
            Some(connection) if connection.remote() == peer => {
                connection.handle_transport_state(state)
            }
            _ => {
                debug!("Ignoring {:?} for {}", state, peer);
                return;
            }
        };
        self.apply(actions);
    }

    /// Handles every queued transport callback.
    pub fn dispatch_notifications(&mut self) {
        while let Some(notification) = self.notifications.pop() {
            match notification {
                Notification::StateChanged(peer, state) => self.on_state_changed(peer, state),
                Notification::ConnectRequest(peer) => {
                    debug!("Client ignores connect request from {}", peer);
                }
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
            let actions = match self.connection.as_mut() {
                Some(connection) if connection.remote() == packet.sender => {
                    connection.receive(packet)
                }
                Some(connection) => {
                    warn!(
                        "Dropping packet from {}, connected to {}",
                        packet.sender,
                        connection.remote()
                    );
                    continue;
                }
                None => {
                    debug!("Dropping packet from {}, not connected", packet.sender);
                    continue;
                }
            };
            self.apply(actions);
        }

        self.dispatch_notifications();
    }

    /// Issues a liveness ping when one is due.
    ///
    /// The outcome is only recorded in the statistics; a failed ping never closes the
    /// connection.
    pub fn update(&mut self, now: Instant) {
        if !self.active {
            return;
        }
        let Some(interval) = self.config.ping_interval else {
            return;
        };
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        if !connection.is_connected() {
            return;
        }
        if let Some(last) = self.last_ping {
            if now.saturating_duration_since(last) < interval {
                return;
            }
        }

        self.last_ping = Some(now);
        let remote = connection.remote();
        let rtt = self.transport.ping(remote);
        match rtt {
            Some(rtt) => debug!("Ping to {} took {:?}", remote, rtt),
            None => warn!("Ping to {} failed", remote),
        }
        connection.statistics_mut().record_ping(rtt);
    }

    /// Runs `receive_data` and `update` using the client's clock.
    pub fn tick(&mut self) {
        self.receive_data();
        let now = self.clock.now();
        self.update(now);
    }

    /// Sends a payload to the server. Returns false if it was not handed to the transport.
    pub fn send(&mut self, payload: &[u8], channel: Channel) -> bool {
        if !self.active {
            return false;
        }
        let Some(connection) = self.connection.as_mut() else {
            self.handler.on_error(ErrorKind::NotConnected);
            return false;
        };
        match connection.send(payload, channel) {
            Ok(actions) => {
                let transmitted = actions.iter().any(|a| matches!(a, PeerAction::Transmit { .. }));
                self.apply(actions);
                transmitted && self.connection.is_some()
            }
            Err(err) => {
                self.handler.on_error(err);
                false
            }
        }
    }

    /// Closes the connection locally.
    pub fn disconnect(&mut self) {
        if !self.active {
            return;
        }
        let actions = match self.connection.as_mut() {
            Some(connection) => connection.disconnect(),
            None => return,
        };
        self.apply(actions);
    }

    /// Holds back reliable traffic and drops unreliable traffic until `unpause`.
    pub fn pause(&mut self) {
        if !self.active {
            return;
        }
        self.paused = true;
        if let Some(connection) = self.connection.as_mut() {
            connection.pause();
        }
    }

    /// Resumes delivery, draining buffered traffic in arrival order.
    pub fn unpause(&mut self) {
        if !self.active {
            return;
        }
        self.paused = false;
        let actions = match self.connection.as_mut() {
            Some(connection) => connection.unpause(),
            None => return,
        };
        self.apply(actions);
    }

    /// Returns true while the connection is up.
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(PeerConnection::is_connected)
    }

    /// Returns true while a connect attempt is in flight.
    pub fn is_connecting(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.state().is_connecting())
    }

    /// Returns the peer the client is connected or connecting to.
    pub fn remote(&self) -> Option<PeerId> {
        self.connection.as_ref().map(PeerConnection::remote)
    }

    /// Returns the number of payloads buffered for delivery.
    pub fn pending_inbound(&self) -> usize {
        self.connection.as_ref().map_or(0, PeerConnection::pending_len)
    }

    /// Returns the connection statistics.
    pub fn statistics(&self) -> Option<&PeerStatistics> {
        self.connection.as_ref().map(PeerConnection::statistics)
    }

    /// Detaches from the transport and discards queued input.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.transport.clear_handlers();
        self.notifications.clear();
        let packets = self.transport.discard_packets();
        info!("Client shut down, discarded {} packets", packets);
    }

    /// Returns true until `shutdown` is called.
    pub fn is_active(&self) -> bool {
        self.active
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

    fn apply(&mut self, actions: Vec<PeerAction>) {
        let mut queue: VecDeque<PeerAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            let Some(connection) = self.connection.as_mut() else {
                break;
            };
            let remote = connection.remote();

            match action {
                PeerAction::Connect => self.transport.connect(remote),
                PeerAction::Accept => self.transport.accept(remote),
                PeerAction::Close => self.transport.close(remote),
                PeerAction::Transmit { payload, policy } => {
                    if self.transport.try_send(remote, &payload, policy) {
                        connection.record_transmitted(payload.len());
                    } else {
                        error!("Transport refused a {} byte payload for {}", payload.len(), remote);
                        for follow_up in connection.send_failed().into_iter().rev() {
                            queue.push_front(follow_up);
                        }
                    }
                }
                PeerAction::Connected => {
                    info!("Connected to {}", remote);
                    self.handler.on_connected();
                }
                PeerAction::Deliver { payload, channel } => {
                    self.handler.on_data_received(&payload, channel);
                }
                PeerAction::Error(err) => self.handler.on_error(err),
                PeerAction::Disconnected { .. } => {
                    self.connection = None;
                    self.last_ping = None;
                    info!("Disconnected from {}", remote);
                    self.handler.on_disconnected();
                }
            }
        }
    }
}
