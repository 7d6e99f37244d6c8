//! In-memory transport for tests and demos.
//!
//! An `EmulatedNetwork` hosts any number of nodes, each addressed by a `PeerId`. Nodes
//! obtained through `EmulatedNetwork::transport` talk to each other with a simplified
//! session handshake (connect → connect request → accept → connected on both sides).
//! Peers that never joined the network are "scripted": calls towards them are only
//! recorded, and the test drives their side through `request_connect`, `notify_state`
//! and `deliver`.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    channel::SendPolicy,
    transport::{ConnectRequestHandler, Packet, StateChangedHandler, Transport, TransportState},
    types::PeerId,
};

/// A call made by a node into its transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportCall {
    /// `Transport::connect`
    Connect(PeerId),
    /// `Transport::accept`
    Accept(PeerId),
    /// `Transport::close`
    Close(PeerId),
    /// `Transport::try_send`, successful or not.
    Send {
        /// Destination peer.
        peer: PeerId,
        /// Native policy requested.
        policy: SendPolicy,
        /// Payload handed to the transport.
        payload: Vec<u8>,
    },
}

#[derive(Default)]
struct Node {
    inbound: VecDeque<Packet>,
    on_connect_request: Option<ConnectRequestHandler>,
    on_state_changed: Option<StateChangedHandler>,
    calls: Vec<TransportCall>,
    requested_by: HashSet<PeerId>,
    established: HashSet<PeerId>,
    failing_sends: HashSet<PeerId>,
    ping_rtt: Option<Duration>,
}

impl Node {
    fn fire_connect_request(&mut self, peer: PeerId) {
        if let Some(handler) = self.on_connect_request.as_mut() {
            handler(peer);
        }
    }

    fn fire_state_changed(&mut self, peer: PeerId, state: TransportState) {
        if let Some(handler) = self.on_state_changed.as_mut() {
            handler(peer, state);
        }
    }
}

#[derive(Default)]
struct NetworkState {
    nodes: HashMap<PeerId, Node>,
}

impl NetworkState {
    fn node(&mut self, id: PeerId) -> &mut Node {
        self.nodes.entry(id).or_default()
    }

    fn establish(&mut self, a: PeerId, b: PeerId) {
        let node_a = self.node(a);
        node_a.established.insert(b);
        node_a.fire_state_changed(b, TransportState::Connected);
        let node_b = self.node(b);
        node_b.established.insert(a);
        node_b.fire_state_changed(a, TransportState::Connected);
    }
}

/// Shared in-memory network of emulated transports.
///
/// Registered connect-request and state-change handlers run while the network lock is
/// held. They must only enqueue work; calling back into any transport of the same
/// network from inside a handler deadlocks.
#[derive(Clone, Default)]
pub struct EmulatedNetwork {
    inner: Arc<Mutex<NetworkState>>,
}

impl std::fmt::Debug for EmulatedNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<PeerId> = self.lock().nodes.keys().copied().collect();
        f.debug_struct("EmulatedNetwork").field("nodes", &nodes).finish()
    }
}

impl EmulatedNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Joins the network as `local` and returns its transport.
    pub fn transport(&self, local: PeerId) -> EmulatedTransport {
        self.lock().node(local);
        EmulatedTransport { local, network: self.clone() }
    }

    /// Makes `from` ask `to` for a session, firing `to`'s connect-request handler.
    pub fn request_connect(&self, from: PeerId, to: PeerId) {
        let mut state = self.lock();
        let node = state.node(to);
        node.requested_by.insert(from);
        node.fire_connect_request(from);
    }

    /// Fires `node`'s state-changed handler as if the transport reported `state` for `peer`.
    pub fn notify_state(&self, node: PeerId, peer: PeerId, state: TransportState) {
        let mut network = self.lock();
        let target = network.node(node);
        match state {
            TransportState::Connected => {
                target.established.insert(peer);
            }
            TransportState::Closed | TransportState::Timeout => {
                target.established.remove(&peer);
            }
            TransportState::Unknown => {}
        }
        target.fire_state_changed(peer, state);
    }

    /// Queues a datagram from `from` in `to`'s inbound queue.
    pub fn deliver(&self, to: PeerId, from: PeerId, policy: SendPolicy, payload: impl Into<Vec<u8>>) {
        self.lock().node(to).inbound.push_back(Packet::new(from, policy, payload.into()));
    }

    /// Returns every call `node` made into its transport, oldest first.
    pub fn calls(&self, node: PeerId) -> Vec<TransportCall> {
        self.lock().node(node).calls.clone()
    }

    /// Returns how many recorded calls of `node` equal `call`.
    pub fn count_calls(&self, node: PeerId, call: &TransportCall) -> usize {
        self.lock().node(node).calls.iter().filter(|c| *c == call).count()
    }

    /// Returns the payloads `node` handed to the transport for `peer`.
    pub fn sent_to(&self, node: PeerId, peer: PeerId) -> Vec<(SendPolicy, Vec<u8>)> {
        self.lock()
            .node(node)
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Send { peer: p, policy, payload } if *p == peer => {
                    Some((*policy, payload.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Makes every send from `node` to `peer` fail.
    pub fn fail_sends(&self, node: PeerId, peer: PeerId) {
        self.lock().node(node).failing_sends.insert(peer);
    }

    /// Sets the round-trip time `node` reports for pings; None makes pings fail.
    pub fn set_ping_rtt(&self, node: PeerId, rtt: Option<Duration>) {
        self.lock().node(node).ping_rtt = rtt;
    }

    /// Returns the number of datagrams waiting in `node`'s inbound queue.
    pub fn queued_packets(&self, node: PeerId) -> usize {
        self.lock().node(node).inbound.len()
    }

    /// Returns true while `node` has handlers installed in both notification slots.
    pub fn has_handlers(&self, node: PeerId) -> bool {
        let mut state = self.lock();
        let node = state.node(node);
        node.on_connect_request.is_some() && node.on_state_changed.is_some()
    }
}

/// Transport endpoint of one node in an `EmulatedNetwork`.
#[derive(Debug)]
pub struct EmulatedTransport {
    local: PeerId,
    network: EmulatedNetwork,
}

impl EmulatedTransport {
    /// Returns the peer id this transport is reachable at.
    pub fn local_id(&self) -> PeerId {
        self.local
    }

    /// Returns the network this transport belongs to.
    pub fn network(&self) -> &EmulatedNetwork {
        &self.network
    }
}

impl Transport for EmulatedTransport {
    fn connect(&mut self, peer: PeerId) {
        let local = self.local;
        let mut state = self.network.lock();
        let node = state.node(local);
        node.calls.push(TransportCall::Connect(peer));
        if node.requested_by.remove(&peer) && state.nodes.contains_key(&peer) {
            state.establish(local, peer);
        } else if let Some(remote) = state.nodes.get_mut(&peer) {
            remote.requested_by.insert(local);
            remote.fire_connect_request(local);
        }
    }

    fn accept(&mut self, peer: PeerId) {
        let local = self.local;
        let mut state = self.network.lock();
        let node = state.node(local);
        node.calls.push(TransportCall::Accept(peer));
        let requested = node.requested_by.remove(&peer);
        if requested && state.nodes.contains_key(&peer) {
            state.establish(local, peer);
        }
    }

    fn close(&mut self, peer: PeerId) {
        let local = self.local;
        let mut state = self.network.lock();
        let node = state.node(local);
        node.calls.push(TransportCall::Close(peer));
        node.established.remove(&peer);
        node.requested_by.remove(&peer);
        if let Some(remote) = state.nodes.get_mut(&peer) {
            let had_session = remote.established.remove(&local);
            let had_request = remote.requested_by.remove(&local);
            if had_session || had_request {
                remote.fire_state_changed(local, TransportState::Closed);
            }
        }
    }

    fn try_send(&mut self, peer: PeerId, payload: &[u8], policy: SendPolicy) -> bool {
        let local = self.local;
        let mut state = self.network.lock();
        let node = state.node(local);
        node.calls.push(TransportCall::Send { peer, policy, payload: payload.to_vec() });
        if node.failing_sends.contains(&peer) {
            return false;
        }
        let established = node.established.contains(&peer);
        match state.nodes.get_mut(&peer) {
            Some(remote) if established => {
                remote.inbound.push_back(Packet::new(local, policy, payload.to_vec()));
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    fn poll_packet(&mut self) -> Option<Packet> {
        self.network.lock().node(self.local).inbound.pop_front()
    }

    fn set_connect_request_handler(&mut self, handler: ConnectRequestHandler) {
        self.network.lock().node(self.local).on_connect_request = Some(handler);
    }

    fn set_state_changed_handler(&mut self, handler: StateChangedHandler) {
        self.network.lock().node(self.local).on_state_changed = Some(handler);
    }

    fn ping(&mut self, _peer: PeerId) -> Option<Duration> {
        self.network.lock().node(self.local).ping_rtt
    }

    fn clear_handlers(&mut self) {
        let mut state = self.network.lock();
        let node = state.node(self.local);
        node.on_connect_request = None;
        node.on_state_changed = None;
    }
}
