//! Logical channels and their translation to native send policies.
//!
//! The upper layer speaks in channel ids (`0` reliable, `1` unreliable); the wrapped
//! transport speaks in send-policy tags. Unrecognized values on either side fall back
//! to the reliable path with a warning rather than being dropped.

use std::convert::TryFrom;

use tracing::warn;

use crate::constants::{RELIABLE_MAX_MESSAGE_SIZE, UNRELIABLE_MAX_MESSAGE_SIZE};

/// Logical delivery class exposed to the upper layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// Delivered by the transport's reliable policy.
    #[default]
    Reliable = 0,
    /// Delivered by the transport's unreliable policy.
    Unreliable = 1,
}

impl Channel {
    /// Resolves an upper-layer channel id. Unknown ids default to `Reliable`.
    pub fn from_id(id: u8) -> Channel {
        match id {
            0 => Channel::Reliable,
            1 => Channel::Unreliable,
            other => {
                warn!("Unknown channel id {}, defaulting to reliable", other);
                Channel::Reliable
            }
        }
    }

    /// Returns the upper-layer id of this channel.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Returns the largest payload this channel carries.
    pub fn max_payload_size(self) -> usize {
        match self {
            Channel::Reliable => RELIABLE_MAX_MESSAGE_SIZE,
            Channel::Unreliable => UNRELIABLE_MAX_MESSAGE_SIZE,
        }
    }

    /// Returns true when `len` fits this channel.
    pub fn fits(self, len: usize) -> bool {
        len <= self.max_payload_size()
    }

    /// Native policy used to send on this channel.
    pub fn send_policy(self) -> SendPolicy {
        match self {
            Channel::Reliable => SendPolicy::Reliable,
            Channel::Unreliable => SendPolicy::Unreliable,
        }
    }

    /// Channel a packet received with `policy` is delivered on.
    pub fn from_policy(policy: SendPolicy) -> Channel {
        match policy {
            SendPolicy::Reliable => Channel::Reliable,
            SendPolicy::Unreliable => Channel::Unreliable,
        }
    }
}

/// Native send policy of the wrapped transport.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SendPolicy {
    /// Packet may be lost or reordered by the transport.
    Unreliable = 0,
    /// Packet is retransmitted until delivered.
    Reliable = 1,
}

impl SendPolicy {
    /// Resolves a raw native tag, defaulting to `Reliable` for unrecognized values.
    pub fn from_tag(tag: u8) -> SendPolicy {
        SendPolicy::try_from(tag).unwrap_or_else(|unknown| {
            warn!("Unknown packet policy {}, defaulting to reliable", unknown);
            SendPolicy::Reliable
        })
    }

    /// Returns the raw native tag.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SendPolicy {
    type Error = u8;

    /// Strict conversion; the unrecognized tag is handed back as the error.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SendPolicy::Unreliable),
            1 => Ok(SendPolicy::Reliable),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_policy_roundtrip() {
        for channel in [Channel::Reliable, Channel::Unreliable] {
            assert_eq!(Channel::from_policy(channel.send_policy()), channel);
            assert_eq!(Channel::from_id(channel.id()), channel);
        }
    }

    #[test]
    fn test_native_tag_roundtrip() {
        for policy in [SendPolicy::Reliable, SendPolicy::Unreliable] {
            assert_eq!(SendPolicy::from_tag(policy.tag()), policy);
        }
    }

    #[test]
    fn test_unknown_native_tag_defaults_to_reliable() {
        assert_eq!(SendPolicy::from_tag(7), SendPolicy::Reliable);
        assert_eq!(Channel::from_policy(SendPolicy::from_tag(255)), Channel::Reliable);
        assert_eq!(SendPolicy::try_from(9), Err(9));
    }

    #[test]
    fn test_unknown_channel_id_defaults_to_reliable() {
        let channel = Channel::from_id(42);
        assert_eq!(channel, Channel::Reliable);
        assert_eq!(channel.max_payload_size(), 65535);
    }

    #[test]
    fn test_channel_limits() {
        assert_eq!(Channel::Reliable.max_payload_size(), 65535);
        assert_eq!(Channel::Unreliable.max_payload_size(), 1200);
        assert!(Channel::Unreliable.fits(1200));
        assert!(!Channel::Unreliable.fits(1201));
        assert!(Channel::Reliable.fits(65535));
        assert!(!Channel::Reliable.fits(65536));
    }
}
