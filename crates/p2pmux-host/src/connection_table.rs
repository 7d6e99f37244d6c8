use std::collections::HashMap;

use p2pmux_core::{
    constants::FIRST_CONNECTION_ID,
    error::{ErrorKind, Result},
    types::{ConnectionId, PeerId},
};

/// Bidirectional mapping between transport peer ids and connection ids.
///
/// Both directions are updated within the same call. Connection ids come from a
/// monotonically increasing counter and are never handed out twice.
#[derive(Debug)]
pub struct ConnectionTable {
    by_peer: HashMap<PeerId, ConnectionId>,
    by_connection: HashMap<ConnectionId, PeerId>,
    max_connections: usize,
    next_id: u32,
}

impl ConnectionTable {
    /// Creates an empty table holding at most `max_connections` entries.
    pub fn new(max_connections: usize) -> Self {
        Self {
            by_peer: HashMap::with_capacity(max_connections),
            by_connection: HashMap::with_capacity(max_connections),
            max_connections,
            next_id: FIRST_CONNECTION_ID,
        }
    }

    /// Registers a peer and assigns it a fresh connection id.
    ///
    /// A failed add leaves the table, including the id counter, untouched.
    pub fn add(&mut self, peer: PeerId) -> Result<ConnectionId> {
        if self.by_peer.contains_key(&peer) {
            return Err(ErrorKind::AlreadyRegistered(peer));
        }
        if self.by_peer.len() >= self.max_connections {
            return Err(ErrorKind::CapacityExceeded { max: self.max_connections });
        }
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(ErrorKind::CapacityExceeded { max: self.max_connections })?;

        let connection = ConnectionId::new(self.next_id);
        self.next_id = next_id;
        self.by_peer.insert(peer, connection);
        self.by_connection.insert(connection, peer);
        Ok(connection)
    }

    /// Removes a connection. Removing an absent id is a no-op.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<PeerId> {
        let peer = self.by_connection.remove(&connection)?;
        self.by_peer.remove(&peer);
        Some(peer)
    }

    /// Returns the connection id assigned to a peer.
    pub fn lookup_by_peer(&self, peer: PeerId) -> Option<ConnectionId> {
        self.by_peer.get(&peer).copied()
    }

    /// Returns the peer behind a connection id.
    pub fn lookup_by_connection(&self, connection: ConnectionId) -> Option<PeerId> {
        self.by_connection.get(&connection).copied()
    }

    /// Returns the number of registered connections.
    pub fn len(&self) -> usize {
        self.by_connection.len()
    }

    /// Returns true if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.by_connection.is_empty()
    }

    /// Returns the maximum number of connections.
    pub fn capacity(&self) -> usize {
        self.max_connections
    }

    /// Iterates over `(connection, peer)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, PeerId)> + '_ {
        self.by_connection.iter().map(|(c, p)| (*c, *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(raw: u64) -> PeerId {
        PeerId::new(raw).unwrap()
    }

    #[test]
    fn test_add_assigns_increasing_ids() {
        let mut table = ConnectionTable::new(4);
        assert_eq!(table.add(peer(10)), Ok(ConnectionId::new(1)));
        assert_eq!(table.add(peer(20)), Ok(ConnectionId::new(2)));
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup_by_peer(peer(20)), Some(ConnectionId::new(2)));
        assert_eq!(table.lookup_by_connection(ConnectionId::new(1)), Some(peer(10)));
    }

    #[test]
    fn test_duplicate_peer_rejected() {
        let mut table = ConnectionTable::new(4);
        table.add(peer(10)).unwrap();
        assert_eq!(table.add(peer(10)), Err(ErrorKind::AlreadyRegistered(peer(10))));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_capacity_rejection_does_not_consume_id() {
        let mut table = ConnectionTable::new(1);
        table.add(peer(10)).unwrap();
        assert_eq!(table.add(peer(20)), Err(ErrorKind::CapacityExceeded { max: 1 }));
        assert_eq!(table.lookup_by_peer(peer(20)), None);

        table.remove(ConnectionId::new(1));
        assert_eq!(table.add(peer(20)), Ok(ConnectionId::new(2)));
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut table = ConnectionTable::new(2);
        let first = table.add(peer(10)).unwrap();
        assert_eq!(table.remove(first), Some(peer(10)));
        let second = table.add(peer(10)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut table = ConnectionTable::new(2);
        let id = table.add(peer(10)).unwrap();
        assert_eq!(table.remove(id), Some(peer(10)));
        assert_eq!(table.remove(id), None);
        assert_eq!(table.remove(ConnectionId::new(99)), None);
        assert!(table.is_empty());
        assert_eq!(table.lookup_by_peer(peer(10)), None);
    }
}
