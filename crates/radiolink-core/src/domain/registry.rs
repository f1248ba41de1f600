//! Bounded registry of paired peers.
//!
//! The `PeerRegistry` is the host's in-memory table of every satellite it has
//! matched and registered during the current session.  It is rebuilt on every
//! boot; nothing is persisted.
//!
//! # Invariants
//!
//! - `len() <= capacity()`, and `capacity() <= MAX_PEERS`.
//! - No two records share an address.
//! - Records are only ever appended.  Index `i` refers to the same peer for
//!   the whole session, which is what lets callers address peers by index in
//!   [`crate::session::Transport::send_to`].
//!
//! # Vec choice
//!
//! The table holds at most a handful of peers, so a `Vec` with a linear
//! duplicate scan is both simpler and faster than a map, and it keeps
//! insertion order for index-based addressing.

use thiserror::Error;

use super::mac::MacAddress;

/// Upper bound on registered peers (the radio driver's peer-table budget).
pub const MAX_PEERS: usize = 5;

/// Reason an insertion was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The address is already registered.
    #[error("peer {0} is already registered")]
    DuplicatePeer(MacAddress),

    /// The registry already holds `capacity` peers.
    #[error("peer registry is full ({capacity} entries)")]
    Full { capacity: usize },
}

/// One registered peer together with its radio parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRecord {
    pub address: MacAddress,
    /// Radio channel the peer is reached on.
    pub channel: u8,
    /// Link encryption flag.  The link is never encrypted.
    pub encrypted: bool,
}

impl PeerRecord {
    /// Creates an unencrypted record.
    pub fn new(address: MacAddress, channel: u8) -> Self {
        Self {
            address,
            channel,
            encrypted: false,
        }
    }
}

/// Append-only, fixed-capacity table of [`PeerRecord`]s.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    peers: Vec<PeerRecord>,
    capacity: usize,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerRegistry {
    /// Creates an empty registry holding up to [`MAX_PEERS`] records.
    pub fn new() -> Self {
        Self::with_capacity(MAX_PEERS)
    }

    /// Creates an empty registry; `capacity` is clamped to `1..=MAX_PEERS`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_PEERS);
        Self {
            peers: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Checks whether `address` could be inserted, without inserting it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePeer`] or [`RegistryError::Full`].
    pub fn admit(&self, address: &MacAddress) -> Result<(), RegistryError> {
        if self.contains(address) {
            return Err(RegistryError::DuplicatePeer(*address));
        }
        if self.is_full() {
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Appends a new peer and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePeer`] if the address is already
    /// present or [`RegistryError::Full`] if the registry is at capacity.
    /// The registry is unchanged on error.
    pub fn try_add(&mut self, address: MacAddress, channel: u8) -> Result<usize, RegistryError> {
        self.admit(&address)?;
        self.peers.push(PeerRecord::new(address, channel));
        Ok(self.peers.len() - 1)
    }

    /// Returns the record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&PeerRecord> {
        self.peers.get(index)
    }

    /// Returns `true` if `address` is registered.
    pub fn contains(&self, address: &MacAddress) -> bool {
        self.peers.iter().any(|p| p.address == *address)
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.iter()
    }

    /// Snapshot of the registered addresses in index order.
    pub fn addresses(&self) -> Vec<MacAddress> {
        self.peers.iter().map(|p| p.address).collect()
    }

    /// Drops every record.  Only used when a session is reinitialised.
    pub(crate) fn clear(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, last])
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = PeerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.capacity(), MAX_PEERS);
    }

    #[test]
    fn test_try_add_appends_and_returns_index() {
        // Arrange
        let mut registry = PeerRegistry::new();

        // Act
        let first = registry.try_add(mac(1), 1);
        let second = registry.try_add(mac(2), 1);

        // Assert
        assert_eq!(first, Ok(0));
        assert_eq!(second, Ok(1));
        assert_eq!(registry.get(1).map(|p| p.address), Some(mac(2)));
        assert!(!registry.get(0).unwrap().encrypted);
    }

    #[test]
    fn test_try_add_rejects_duplicate_address() {
        let mut registry = PeerRegistry::new();
        registry.try_add(mac(1), 1).unwrap();

        let result = registry.try_add(mac(1), 6);

        assert_eq!(result, Err(RegistryError::DuplicatePeer(mac(1))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().channel, 1, "record must not be mutated");
    }

    #[test]
    fn test_try_add_rejects_when_full() {
        // Arrange
        let mut registry = PeerRegistry::new();
        for i in 0..MAX_PEERS as u8 {
            registry.try_add(mac(i), 1).unwrap();
        }

        // Act
        let result = registry.try_add(mac(0xEE), 1);

        // Assert
        assert_eq!(result, Err(RegistryError::Full { capacity: MAX_PEERS }));
        assert_eq!(registry.len(), MAX_PEERS);
    }

    #[test]
    fn test_with_capacity_is_clamped() {
        assert_eq!(PeerRegistry::with_capacity(0).capacity(), 1);
        assert_eq!(PeerRegistry::with_capacity(3).capacity(), 3);
        assert_eq!(PeerRegistry::with_capacity(99).capacity(), MAX_PEERS);
    }

    #[test]
    fn test_admit_does_not_mutate() {
        let registry = PeerRegistry::with_capacity(1);
        assert!(registry.admit(&mac(1)).is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_addresses_preserve_insertion_order() {
        let mut registry = PeerRegistry::new();
        registry.try_add(mac(9), 1).unwrap();
        registry.try_add(mac(3), 1).unwrap();
        registry.try_add(mac(5), 1).unwrap();
        assert_eq!(registry.addresses(), vec![mac(9), mac(3), mac(5)]);
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = PeerRegistry::new();
        registry.try_add(mac(1), 1).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.try_add(mac(1), 1).is_ok());
    }
}
