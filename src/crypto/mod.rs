//! Packet-protection interfaces and the stub key lifecycle.
//!
//! QUIC needs several crypto primitives: AEAD for packet encryption,
//! header protection, and a keyed hash. The [`CryptoProvider`]
//! trait bundles these together. This crate only ships non-cryptographic
//! placeholders for them (see [`placeholder`]); the keys handed to the
//! transport are opaque [`PacketKey`] handles tagged with their level.

mod aead;
pub mod header_protection;
mod hash;

pub mod keys;
pub mod placeholder;

pub use aead::Aead;
pub use header_protection::HeaderProtection;
pub use hash::KeyedHash;
pub use keys::{
    allocate_key, create_initial_keys, free_key, update_key, KeyId, KeySlots, PacketKey,
};

use crate::error::Error;

/// Encryption level: which keys protect a region of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Initial = 0,
    Handshake = 1,
    /// 0-RTT early data.
    ZeroRtt = 2,
    /// 1-RTT application data.
    OneRtt = 3,
}

impl Level {
    /// Number of encryption levels.
    pub const COUNT: usize = 4;

    pub const ALL: [Level; Level::COUNT] =
        [Level::Initial, Level::Handshake, Level::ZeroRtt, Level::OneRtt];

    /// Slot index for per-level key arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Bundle of cryptographic primitives needed by QUIC.
///
/// Implementations provide AEAD, header protection and a keyed hash
/// for a specific cipher suite.
pub trait CryptoProvider {
    type Aead: Aead;
    type HeaderProtection: HeaderProtection;
    type Hash: KeyedHash;

    /// Create an AEAD instance from a key.
    fn aead(&self, key: &[u8]) -> Result<Self::Aead, Error>;

    /// Create a keyed hash from a salt.
    fn hash(&self, salt: &[u8]) -> Result<Self::Hash, Error>;

    /// Create a header protection cipher from a key.
    fn header_protection(&self, key: &[u8]) -> Result<Self::HeaderProtection, Error>;
}
