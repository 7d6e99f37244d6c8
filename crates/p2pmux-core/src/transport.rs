//! Transport abstraction for the wrapped peer-to-peer network.

use std::time::Duration;

use crate::{channel::SendPolicy, types::PeerId};

/// Session state reported by the transport for a peer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// The transport has nothing to say about the peer yet.
    Unknown,
    /// The session with the peer is up.
    Connected,
    /// The session attempt or the live session timed out.
    Timeout,
    /// The session was closed by either side.
    Closed,
}

/// A datagram handed out by `Transport::poll_packet`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    /// Peer the datagram came from.
    pub sender: PeerId,
    /// Native policy it was sent with.
    pub policy: SendPolicy,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Creates a new inbound packet.
    pub fn new(sender: PeerId, policy: SendPolicy, payload: Vec<u8>) -> Self {
        Self { sender, policy, payload }
    }
}

/// Handler invoked when a remote peer asks to open a session.
pub type ConnectRequestHandler = Box<dyn FnMut(PeerId) + Send>;
/// Handler invoked when the session state for a peer changes.
pub type StateChangedHandler = Box<dyn FnMut(PeerId, TransportState) + Send>;

/// Session-oriented datagram transport addressed by peer ids.
///
/// Implementations hold exactly one handler per notification slot; setting a handler
/// replaces the previous one. Handlers may be invoked from inside any transport call
/// or from the transport's own machinery, so callers should only enqueue work in them.
pub trait Transport {
    /// Starts an outbound session with the peer.
    fn connect(&mut self, peer: PeerId);

    /// Accepts a session requested by the peer.
    fn accept(&mut self, peer: PeerId);

    /// Closes the session with the peer.
    fn close(&mut self, peer: PeerId);

    /// Sends a datagram. Returns false when the transport refused it.
    fn try_send(&mut self, peer: PeerId, payload: &[u8], policy: SendPolicy) -> bool;

    /// Returns the next queued inbound datagram, if any. Never blocks.
    fn poll_packet(&mut self) -> Option<Packet>;

    /// Replaces the connect-request handler.
    fn set_connect_request_handler(&mut self, handler: ConnectRequestHandler);

    /// Replaces the state-changed handler.
    fn set_state_changed_handler(&mut self, handler: StateChangedHandler);

    /// Best-effort liveness check; returns the round-trip time on success.
    ///
    /// Transports without a ping primitive keep the default, which always reports
    /// failure.
    fn ping(&mut self, _peer: PeerId) -> Option<Duration> {
        None
    }

    /// Discards every queued inbound datagram.
    fn discard_packets(&mut self) -> usize {
        let mut discarded = 0;
        while self.poll_packet().is_some() {
            discarded += 1;
        }
        discarded
    }

    /// Resets both notification slots to no-ops.
    fn clear_handlers(&mut self) {
        self.set_connect_request_handler(Box::new(|_| {}));
        self.set_state_changed_handler(Box::new(|_, _| {}));
    }
}
