use p2pmux_core::{
    channel::{Channel, SendPolicy},
    error::ErrorKind,
};

/// Instructions a `PeerConnection` hands back to whoever owns it.
///
/// The connection never touches the transport or the upper layer itself; the owning
/// server or client applies these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAction {
    /// Issue `Transport::connect` to the remote peer.
    Connect,
    /// Issue `Transport::accept` to the remote peer.
    Accept,
    /// Issue `Transport::close` to the remote peer.
    Close,
    /// Hand the payload to `Transport::try_send`.
    Transmit {
        /// Payload bytes
        payload: Vec<u8>,
        /// Native policy to send with
        policy: SendPolicy,
    },
    /// Tell the upper layer the connection is up.
    Connected,
    /// Hand a payload to the upper layer.
    Deliver {
        /// Payload bytes
        payload: Vec<u8>,
        /// Channel it arrived on
        channel: Channel,
    },
    /// The record reached `Closed`; emitted exactly once.
    Disconnected {
        /// Whether `Connected` was ever emitted for this record
        was_connected: bool,
    },
    /// Report a connection-local error to the upper layer.
    Error(ErrorKind),
}
