/// Peer connection state machine.
///
/// Tracks the lifecycle of a peer connection from the first connect request or
/// outbound connect through active communication to its terminal close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerConnectionState {
    /// Record created, no connect or accept issued yet
    #[default]
    Unknown,

    /// Connect or accept issued, waiting for the transport to report the session up
    Connecting,

    /// The transport reported the session up
    Connected,

    /// The transport reported a timeout; a reconnect attempt is in flight
    TimedOut,

    /// Terminal: the session is gone and the record is about to be dropped
    Closed,
}

impl PeerConnectionState {
    /// Returns true if inbound data is delivered rather than buffered
    pub fn is_connected(&self) -> bool {
        matches!(self, PeerConnectionState::Connected)
    }

    /// Returns true while the session is being (re)established
    pub fn is_connecting(&self) -> bool {
        matches!(self, PeerConnectionState::Connecting | PeerConnectionState::TimedOut)
    }

    /// Returns true once the state can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, PeerConnectionState::Closed)
    }

    /// Returns true if a transport timeout applies to this state
    pub fn can_time_out(&self) -> bool {
        matches!(
            self,
            PeerConnectionState::Connecting
                | PeerConnectionState::Connected
                | PeerConnectionState::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(PeerConnectionState::default(), PeerConnectionState::Unknown);
        assert!(PeerConnectionState::Connected.is_connected());
        assert!(PeerConnectionState::TimedOut.is_connecting());
        assert!(PeerConnectionState::Connecting.is_connecting());
        assert!(!PeerConnectionState::Unknown.can_time_out());
        assert!(PeerConnectionState::Closed.is_terminal());
        assert!(!PeerConnectionState::Closed.can_time_out());
    }
}
