//! Per-listener TLS session shared by every handshake it creates.

use crate::error::Error;

/// Largest ALPN name: its length travels in one byte.
pub const MAX_ALPN_LEN: usize = 255;
/// Size of a session ticket encryption key.
pub const TICKET_KEY_LEN: usize = 44;

/// Shared, immutable application protocol descriptor.
///
/// Wrap in an `Arc` and hand a clone to each [`HandshakeConfig`].
///
/// [`HandshakeConfig`]: crate::tls::handshake::HandshakeConfig
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSession {
    alpn: heapless::Vec<u8, MAX_ALPN_LEN>,
}

impl TlsSession {
    /// Create a session advertising a single application protocol.
    pub fn new(alpn: &[u8]) -> Result<Self, Error> {
        if alpn.is_empty() {
            return Err(Error::InvalidParameter);
        }
        let alpn = heapless::Vec::from_slice(alpn).map_err(|_| Error::InvalidParameter)?;
        Ok(Self { alpn })
    }

    pub fn alpn(&self) -> &[u8] {
        &self.alpn
    }

    /// Accepted and ignored: tickets are never encrypted.
    pub fn set_ticket_key(&self, _key: &[u8; TICKET_KEY_LEN]) -> Result<(), Error> {
        Ok(())
    }

    /// Accepted and ignored: there is no ticket store.
    pub fn add_ticket(&self, _ticket: &[u8]) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_is_kept() {
        let session = TlsSession::new(b"h3").unwrap();
        assert_eq!(session.alpn(), b"h3");
    }

    #[test]
    fn alpn_length_limits() {
        assert_eq!(TlsSession::new(b""), Err(Error::InvalidParameter));
        assert!(TlsSession::new(&[b'a'; MAX_ALPN_LEN]).is_ok());
        assert_eq!(
            TlsSession::new(&[b'a'; MAX_ALPN_LEN + 1]),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn ticket_entry_points_are_noops() {
        let session = TlsSession::new(b"h3").unwrap();
        assert!(session.set_ticket_key(&[7u8; TICKET_KEY_LEN]).is_ok());
        assert!(session.add_ticket(&[1, 2, 3]).is_ok());
        assert_eq!(session.alpn(), b"h3");
    }
}
