//! Stub TLS-shaped handshake for QUIC.
//!
//! The exchange mirrors TLS 1.3 in shape only:
//! - ClientInitial carries SNI, ALPN, a session ticket and transport parameters
//! - ServerInitial + ServerHandshake answer it in one flight
//! - ClientHandshakeAck completes the handshake, Ticket follows
//!
//! Nothing is signed or encrypted. Each transition activates packet keys
//! for the next encryption level and reports what happened as
//! [`ResultFlags`].

pub mod config;
pub mod extensions;
pub mod handshake;
pub mod messages;
pub mod session;
pub mod state;

pub use config::{CertificateChain, CertificateProvider, NullCertificate, SecConfig};
pub use handshake::{HandshakeContext, Processed, Role};
pub use messages::{Message, MessageType};

use core::ops::{BitOr, BitOrAssign};

/// What changed during one `process_data` call. Independent bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ResultFlags(pub u16);

impl ResultFlags {
    /// Bytes were appended to the output buffer.
    pub const DATA: Self = Self(0x0001);
    pub const READ_KEY_UPDATED: Self = Self(0x0002);
    pub const WRITE_KEY_UPDATED: Self = Self(0x0004);
    pub const EARLY_DATA_ACCEPT: Self = Self(0x0008);
    pub const EARLY_DATA_REJECT: Self = Self(0x0010);
    pub const COMPLETE: Self = Self(0x0020);
    pub const TICKET: Self = Self(0x0040);
    pub const ERROR: Self = Self(0x8000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ResultFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ResultFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values() {
        assert_eq!(ResultFlags::DATA.bits(), 0x1);
        assert_eq!(ResultFlags::TICKET.bits(), 0x40);
        assert_eq!(ResultFlags::ERROR.bits(), 0x8000);
    }

    #[test]
    fn combine_and_test() {
        let mut flags = ResultFlags::empty();
        assert!(flags.is_empty());
        flags |= ResultFlags::DATA;
        let flags = flags | ResultFlags::COMPLETE;
        assert!(flags.contains(ResultFlags::DATA | ResultFlags::COMPLETE));
        assert!(!flags.contains(ResultFlags::ERROR));
        assert!(flags.contains(ResultFlags::empty()));
    }
}
