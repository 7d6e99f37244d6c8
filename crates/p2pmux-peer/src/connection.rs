use p2pmux_core::{
    channel::Channel,
    config::Config,
    error::{ErrorKind, Result},
    transport::{Packet, TransportState},
    types::PeerId,
};
use tracing::{debug, info, warn};

use crate::{
    action::PeerAction,
    peer_state::PeerConnectionState,
    pending_queue::{Enqueued, InboundPacket, PendingQueue},
    statistics::PeerStatistics,
};

/// Session with a single remote peer.
///
/// Tracks the connection state reported by the transport, holds back inbound data
/// until the session is up (and while paused), and turns every input into a list of
/// `PeerAction`s for the owner to apply.
#[derive(Debug)]
pub struct PeerConnection {
    /// Transport id of the remote endpoint
    remote: PeerId,
    /// Current connection state
    state: PeerConnectionState,
    /// Set once `Connected` has been emitted
    announced: bool,
    /// Reliable traffic is buffered and unreliable traffic dropped while set
    paused: bool,
    /// Consecutive transport timeouts since the last `Connected`
    consecutive_timeouts: u8,
    /// Inbound payloads not yet deliverable
    pending: PendingQueue,
    /// Traffic counters
    statistics: PeerStatistics,
    /// Reconnect attempts allowed after a timeout
    timeout_retries: u8,
}

impl PeerConnection {
    /// Creates a record in the `Unknown` state.
    pub fn new(remote: PeerId, config: &Config) -> PeerConnection {
        PeerConnection {
            remote,
            state: PeerConnectionState::Unknown,
            announced: false,
            paused: false,
            consecutive_timeouts: 0,
            pending: PendingQueue::new(config.max_pending_packets, config.pending_overflow),
            statistics: PeerStatistics::default(),
            timeout_retries: config.timeout_retries,
        }
    }

    /// Returns the remote peer id.
    pub fn remote(&self) -> PeerId {
        self.remote
    }

    /// Returns the current connection state.
    pub fn state(&self) -> PeerConnectionState {
        self.state
    }

    /// Returns true while inbound data is being delivered.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Returns true once the record reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns true while paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns the number of inbound payloads waiting for delivery.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the connection statistics.
    pub fn statistics(&self) -> &PeerStatistics {
        &self.statistics
    }

    /// Returns a mutable reference to the connection statistics.
    pub fn statistics_mut(&mut self) -> &mut PeerStatistics {
        &mut self.statistics
    }

    // ===== Lifecycle =====

    /// Starts an outbound session (client side).
    pub fn begin_connect(&mut self) -> Vec<PeerAction> {
        self.begin(PeerAction::Connect)
    }

    /// Accepts an inbound session request (server side).
    pub fn begin_accept(&mut self) -> Vec<PeerAction> {
        self.begin(PeerAction::Accept)
    }

    fn begin(&mut self, action: PeerAction) -> Vec<PeerAction> {
        if self.state != PeerConnectionState::Unknown {
            debug!("Ignoring {:?} for peer {} in state {:?}", action, self.remote, self.state);
            return Vec::new();
        }
        self.state = PeerConnectionState::Connecting;
        vec![action]
    }

    /// Applies a state change reported by the transport.
    pub fn handle_transport_state(&mut self, reported: TransportState) -> Vec<PeerAction> {
        if self.state.is_terminal() {
            debug!("Ignoring {:?} for closed peer {}", reported, self.remote);
            return Vec::new();
        }

        match reported {
            TransportState::Unknown => Vec::new(),
            TransportState::Connected => self.on_connected(),
            TransportState::Timeout => self.on_timeout(),
            TransportState::Closed => {
                info!("Peer {} closed the connection", self.remote);
                self.close(false)
            }
        }
    }

    fn on_connected(&mut self) -> Vec<PeerAction> {
        if self.state.is_connected() {
            return Vec::new();
        }
        self.state = PeerConnectionState::Connected;
        self.consecutive_timeouts = 0;

        let mut actions = Vec::new();
        if !self.announced {
            self.announced = true;
            actions.push(PeerAction::Connected);
        }
        if !self.paused {
            self.drain_pending(&mut actions);
        }
        actions
    }

    fn on_timeout(&mut self) -> Vec<PeerAction> {
        if !self.state.can_time_out() {
            debug!("Ignoring timeout for peer {} in state {:?}", self.remote, self.state);
            return Vec::new();
        }
        self.statistics.timeouts += 1;

        if self.consecutive_timeouts < self.timeout_retries {
            self.consecutive_timeouts += 1;
            self.state = PeerConnectionState::TimedOut;
            warn!(
                "Connection to {} timed out, reconnecting (attempt {})",
                self.remote, self.consecutive_timeouts
            );
            vec![PeerAction::Connect]
        } else {
            warn!("Connection to {} timed out again, closing", self.remote);
            self.close(true)
        }
    }

    /// Closes the connection locally. Idempotent.
    pub fn disconnect(&mut self) -> Vec<PeerAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        info!("Disconnecting from {}", self.remote);
        self.close(true)
    }

    fn close(&mut self, notify_transport: bool) -> Vec<PeerAction> {
        self.state = PeerConnectionState::Closed;
        self.pending.clear();

        let mut actions = Vec::with_capacity(2);
        if notify_transport {
            actions.push(PeerAction::Close);
        }
        actions.push(PeerAction::Disconnected { was_connected: self.announced });
        actions
    }

    fn fail(&mut self, error: ErrorKind) -> Vec<PeerAction> {
        warn!("Closing connection to {}: {}", self.remote, error);
        let mut actions = vec![PeerAction::Error(error)];
        actions.extend(self.close(true));
        actions
    }

    // ===== Inbound =====

    /// Feeds a packet received from the remote peer.
    pub fn receive(&mut self, packet: Packet) -> Vec<PeerAction> {
        let Packet { payload, policy, .. } = packet;
        let channel = Channel::from_policy(policy);
        if self.state.is_terminal() {
            debug!("Dropping {} byte packet for closed peer {}", payload.len(), self.remote);
            return Vec::new();
        }

        self.statistics.packets_received += 1;
        self.statistics.bytes_received += payload.len() as u64;

        if !channel.fits(payload.len()) {
            return self.fail(ErrorKind::OversizedPayload {
                channel,
                size: payload.len(),
                max: channel.max_payload_size(),
            });
        }

        if self.paused && channel == Channel::Unreliable {
            self.statistics.unreliable_dropped += 1;
            return Vec::new();
        }

        let packet = InboundPacket::new(payload, channel);
        if !self.state.is_connected() || self.paused {
            return self.buffer(packet);
        }

        let mut actions = Vec::new();
        if self.pending.is_empty() {
            self.deliver(packet, &mut actions);
        } else {
            let buffered = self.buffer(packet);
            if !buffered.is_empty() {
                return buffered;
            }
            self.drain_pending(&mut actions);
        }
        actions
    }

    fn buffer(&mut self, packet: InboundPacket) -> Vec<PeerAction> {
        match self.pending.push(packet) {
            Ok(Enqueued::Queued) => {}
            Ok(Enqueued::EvictedOldest) | Ok(Enqueued::DroppedNewest) => {
                warn!("Pending queue for {} is full, dropping a packet", self.remote);
                self.statistics.pending_dropped += 1;
            }
            Err(error) => return self.fail(error),
        }
        self.statistics.pending_high_water = self.pending.high_water();
        Vec::new()
    }

    fn deliver(&mut self, packet: InboundPacket, actions: &mut Vec<PeerAction>) {
        self.statistics.packets_delivered += 1;
        actions.push(PeerAction::Deliver { payload: packet.payload, channel: packet.channel });
    }

    fn drain_pending(&mut self, actions: &mut Vec<PeerAction>) {
        let drained: Vec<InboundPacket> = self.pending.drain().collect();
        for packet in drained {
            self.deliver(packet, actions);
        }
    }

    // ===== Pause =====

    /// Holds back reliable traffic and discards unreliable traffic until `unpause`.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes delivery, draining everything buffered in arrival order.
    pub fn unpause(&mut self) -> Vec<PeerAction> {
        let mut actions = Vec::new();
        if !self.paused {
            return actions;
        }
        self.paused = false;
        if self.state.is_connected() {
            self.drain_pending(&mut actions);
        }
        actions
    }

    // ===== Outbound =====

    /// Prepares a payload for sending.
    ///
    /// Returns `NotConnected` without side effects when the session is not up. Empty
    /// and oversized payloads are protocol violations and close the connection.
    pub fn send(&mut self, payload: &[u8], channel: Channel) -> Result<Vec<PeerAction>> {
        if !self.state.is_connected() {
            return Err(ErrorKind::NotConnected);
        }
        if payload.is_empty() {
            return Ok(self.fail(ErrorKind::EmptyPayload));
        }
        if !channel.fits(payload.len()) {
            return Ok(self.fail(ErrorKind::OversizedPayload {
                channel,
                size: payload.len(),
                max: channel.max_payload_size(),
            }));
        }
        Ok(vec![PeerAction::Transmit { payload: payload.to_vec(), policy: channel.send_policy() }])
    }

    /// Records a payload the transport accepted.
    pub fn record_transmitted(&mut self, bytes: usize) {
        self.statistics.packets_sent += 1;
        self.statistics.bytes_sent += bytes as u64;
    }

    /// Reacts to the transport refusing a payload; a failed send is fatal.
    pub fn send_failed(&mut self) -> Vec<PeerAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        self.fail(ErrorKind::SendFailure(self.remote))
    }
}
