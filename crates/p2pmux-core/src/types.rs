use std::{fmt, num::NonZeroU64, str::FromStr};

use crate::error::ErrorKind;

/// Transport-native identifier of a remote endpoint.
///
/// Peer ids are opaque 64-bit values handed out by the wrapped transport. Zero is
/// reserved by the transport as "no peer" and is never a valid id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(NonZeroU64);

impl PeerId {
    /// Wraps a raw transport id, returning `None` for the reserved value zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(PeerId)
    }

    /// Returns the raw 64-bit value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PeerId {
    type Err = ErrorKind;

    /// Parses a decimal peer id. Surrounding whitespace is tolerated, anything else
    /// that is not a non-zero `u64` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(PeerId::new)
            .ok_or_else(|| ErrorKind::MalformedAddress(s.to_owned()))
    }
}

impl TryFrom<u64> for PeerId {
    type Error = ErrorKind;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        PeerId::new(value).ok_or_else(|| ErrorKind::MalformedAddress(value.to_string()))
    }
}

/// Small integer handle the upper layer uses to address a connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u32);

impl ConnectionId {
    /// Creates a connection id from its raw value.
    pub const fn new(raw: u32) -> Self {
        ConnectionId(raw)
    }

    /// Returns the raw value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ConnectionId> for u32 {
    fn from(id: ConnectionId) -> u32 {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer_id() {
        let id: PeerId = "1234567890123".parse().unwrap();
        assert_eq!(id.get(), 1_234_567_890_123);
        assert_eq!(id.to_string(), "1234567890123");
    }

    #[test]
    fn test_parse_peer_id_trims_whitespace() {
        let id: PeerId = " 42\n".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn test_parse_peer_id_max_value() {
        let id: PeerId = u64::MAX.to_string().parse().unwrap();
        assert_eq!(id.get(), u64::MAX);
    }

    #[test]
    fn test_parse_peer_id_rejects_garbage() {
        for input in ["", "abc", "-5", "12.5", "18446744073709551616", "0x10", "1 2"] {
            let result = input.parse::<PeerId>();
            assert_eq!(result, Err(ErrorKind::MalformedAddress(input.to_owned())), "{input:?}");
        }
    }

    #[test]
    fn test_zero_is_not_a_peer() {
        assert!(PeerId::new(0).is_none());
        assert!("0".parse::<PeerId>().is_err());
        assert!(PeerId::try_from(0u64).is_err());
    }

    #[test]
    fn test_connection_id_roundtrip() {
        let id = ConnectionId::new(7);
        assert_eq!(u32::from(id), 7);
        assert_eq!(id.to_string(), "7");
    }
}
