/// Top-level crate error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument is out of range.
    #[error("invalid parameter")]
    InvalidParameter,
    /// Invalid state for the requested operation.
    #[error("invalid state")]
    InvalidState,
    /// Caller-provided buffer too small.
    #[error("buffer too small, need {needed} bytes")]
    BufferTooSmall { needed: usize },
    /// The operation exists but is not implemented by this engine.
    #[error("not supported")]
    NotSupported,
    /// A length field overruns its enclosing region, or a body is shorter
    /// than its fixed shape.
    #[error("malformed handshake framing")]
    Framing,
    /// The ClientInitial carried an extension outside the allow-list.
    #[error("unrecognized extension type {0:#06x}")]
    UnknownExtension(u16),
    /// Message type not valid for the current handshake state.
    #[error("unexpected handshake message type {0}")]
    UnexpectedMessage(u8),
    /// The peer reported a failed handshake.
    #[error("peer reported handshake failure")]
    HandshakeFailed,
    /// The certificate provider accepted none of the offered algorithms.
    #[error("no matching signature algorithm")]
    NoSignatureAlgorithm,
    /// The peer's certificate chain could not be parsed.
    #[error("certificate parse error")]
    CertificateParse,
    /// The peer's certificate chain failed validation.
    #[error("certificate chain validation failed")]
    CertificateValidation,
}

impl Error {
    /// Whether the error leaves the handshake unable to make progress.
    ///
    /// Only output-capacity exhaustion is left to the caller to retry.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Error::BufferTooSmall { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_capacity_errors_are_retryable() {
        assert!(!Error::BufferTooSmall { needed: 8 }.is_fatal());
        assert!(Error::Framing.is_fatal());
        assert!(Error::UnknownExtension(0x2b).is_fatal());
        assert!(Error::CertificateValidation.is_fatal());
    }

    #[test]
    fn display_includes_details() {
        assert_eq!(
            Error::BufferTooSmall { needed: 266 }.to_string(),
            "buffer too small, need 266 bytes"
        );
        assert_eq!(
            Error::UnknownExtension(0x2b).to_string(),
            "unrecognized extension type 0x002b"
        );
    }
}
