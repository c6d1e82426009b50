//! Packet key lifecycle.
//!
//! Keys carry no material in this engine: a [`PacketKey`] is an opaque
//! handle tagged with its encryption level and a unique id. Handles are
//! move-only, so each allocation is freed exactly once by whoever owns it.
//! [`KeySlots`] holds one optional key per level for a single direction.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::crypto::Level;
use crate::error::Error;

/// Unique identity of one key allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId(u64);

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque packet-protection key for one encryption level.
#[derive(Debug, PartialEq, Eq)]
pub struct PacketKey {
    level: Level,
    id: KeyId,
}

impl PacketKey {
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Release the key. Equivalent to dropping it.
    pub fn free(self) {
        tracing::trace!(level = ?self.level, id = self.id.0, "freeing packet key");
    }
}

/// Allocate a fresh key handle for `level`.
pub fn allocate_key(level: Level) -> PacketKey {
    let id = KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed));
    tracing::trace!(?level, id = id.0, "allocated packet key");
    PacketKey { level, id }
}

/// Create the Initial read and write keys for a connection.
///
/// Real QUIC derives these from the version salt and the client's
/// destination connection ID; the stub ignores both and always succeeds.
pub fn create_initial_keys(
    _is_server: bool,
    _salt: &[u8],
    _connection_id: &[u8],
) -> Result<(PacketKey, PacketKey), Error> {
    Ok((allocate_key(Level::Initial), allocate_key(Level::Initial)))
}

/// Derive the next-generation 1-RTT key from `old`.
///
/// Only 1-RTT keys can be updated; anything else is `InvalidState`.
pub fn update_key(old: &PacketKey) -> Result<PacketKey, Error> {
    if old.level != Level::OneRtt {
        return Err(Error::InvalidState);
    }
    Ok(allocate_key(Level::OneRtt))
}

/// Free a key if present. `None` is a no-op.
pub fn free_key(key: Option<PacketKey>) {
    if let Some(key) = key {
        key.free();
    }
}

/// One direction's keys, one optional slot per encryption level.
#[derive(Debug, Default)]
pub struct KeySlots {
    slots: [Option<PacketKey>; Level::COUNT],
}

impl KeySlots {
    /// Create an empty key set (no keys installed yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a key into the `level` slot, freeing any key it held.
    pub fn install(&mut self, level: Level) {
        free_key(self.slots[level.index()].replace(allocate_key(level)));
    }

    pub fn get(&self, level: Level) -> Option<&PacketKey> {
        self.slots[level.index()].as_ref()
    }

    /// Hand the key for `level` to the caller, leaving the slot empty.
    pub fn take(&mut self, level: Level) -> Option<PacketKey> {
        self.slots[level.index()].take()
    }

    pub fn has(&self, level: Level) -> bool {
        self.slots[level.index()].is_some()
    }

    /// Free every installed key.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            free_key(slot.take());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_keys_are_initial_level() {
        let (read, write) = create_initial_keys(false, &[0u8; 20], &[1, 2, 3, 4]).unwrap();
        assert_eq!(read.level(), Level::Initial);
        assert_eq!(write.level(), Level::Initial);
        assert_ne!(read.id(), write.id());
    }

    #[test]
    fn initial_keys_ignore_inputs() {
        assert!(create_initial_keys(true, &[], &[]).is_ok());
        assert!(create_initial_keys(false, &[0xFF; 20], &[0xAA; 20]).is_ok());
    }

    #[test]
    fn update_rejects_non_one_rtt_keys() {
        for level in [Level::Initial, Level::Handshake, Level::ZeroRtt] {
            let key = allocate_key(level);
            assert_eq!(update_key(&key), Err(Error::InvalidState));
        }
    }

    #[test]
    fn update_one_rtt_yields_distinct_key() {
        let old = allocate_key(Level::OneRtt);
        let new = update_key(&old).unwrap();
        assert_eq!(new.level(), Level::OneRtt);
        assert_ne!(new.id(), old.id());
    }

    #[test]
    fn free_none_is_noop() {
        free_key(None);
        free_key(Some(allocate_key(Level::Handshake)));
    }

    #[test]
    fn slots_install_take_clear() {
        let mut slots = KeySlots::new();
        assert!(!slots.has(Level::Handshake));

        slots.install(Level::Handshake);
        let first = slots.get(Level::Handshake).unwrap().id();
        slots.install(Level::Handshake);
        assert_ne!(slots.get(Level::Handshake).unwrap().id(), first);

        let key = slots.take(Level::Handshake).unwrap();
        assert_eq!(key.level(), Level::Handshake);
        assert!(!slots.has(Level::Handshake));
        assert!(slots.take(Level::Handshake).is_none());

        slots.install(Level::Initial);
        slots.install(Level::OneRtt);
        slots.clear();
        for level in Level::ALL {
            assert!(!slots.has(level));
        }
    }
}
