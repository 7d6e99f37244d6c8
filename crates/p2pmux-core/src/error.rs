//! Error kinds reported by the multiplexing layers.
//!
//! None of these abort a server or client. They are either returned from the call
//! that caused them or surfaced to the upper layer through `on_error`.

use thiserror::Error;

use crate::{channel::Channel, types::{ConnectionId, PeerId}};

/// Everything that can go wrong on a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The connection table is full; the connect request was refused.
    #[error("connection limit of {max} reached")]
    CapacityExceeded {
        /// Configured maximum number of connections.
        max: usize,
    },
    /// The peer already owns a connection id.
    #[error("peer {0} is already registered")]
    AlreadyRegistered(PeerId),
    /// No live connection has this id.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    /// A packet arrived from a peer that has no connection.
    #[error("packet from unknown sender {0}")]
    UnknownSender(PeerId),
    /// A payload exceeded the bound of its channel.
    #[error("{size} byte payload exceeds the {max} byte limit of the {channel:?} channel")]
    OversizedPayload {
        /// Channel the payload was sent or received on.
        channel: Channel,
        /// Size of the rejected payload.
        size: usize,
        /// Bound of the channel.
        max: usize,
    },
    /// An empty payload was submitted for sending.
    #[error("empty payloads cannot be sent")]
    EmptyPayload,
    /// The transport refused to send to the peer.
    #[error("transport failed to send to peer {0}")]
    SendFailure(PeerId),
    /// A peer address string could not be parsed.
    #[error("malformed peer address {0:?}")]
    MalformedAddress(String),
    /// The connection is not in the `Connected` state.
    #[error("connection is not established")]
    NotConnected,
    /// The pending inbound queue hit its bound.
    #[error("pending inbound queue exceeded {max} packets")]
    PendingOverflow {
        /// Configured bound of the queue.
        max: usize,
    },
}

/// Convenient alias for results throughout p2pmux crates.
pub type Result<T> = std::result::Result<T, ErrorKind>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ErrorKind::OversizedPayload { channel: Channel::Unreliable, size: 1201, max: 1200 };
        assert_eq!(
            err.to_string(),
            "1201 byte payload exceeds the 1200 byte limit of the Unreliable channel"
        );
        assert_eq!(
            ErrorKind::UnknownConnection(ConnectionId::new(3)).to_string(),
            "unknown connection 3"
        );
        assert_eq!(
            ErrorKind::MalformedAddress("abc".into()).to_string(),
            "malformed peer address \"abc\""
        );
    }
}
