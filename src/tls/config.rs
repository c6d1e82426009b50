//! Security configuration shared across handshakes.
//!
//! A [`SecConfig`] is created once (per listener or per client
//! configuration) and shared through `Arc`. Server configurations hold a
//! rundown reference for as long as any clone is alive, so the owner of
//! the [`RundownRef`] can wait for every handshake to let go before
//! tearing down.

use std::fmt;
use std::sync::Arc;

use core::ops::BitOr;

use crate::error::Error;
use crate::rundown::{RundownGuard, RundownRef};

/// Capacity reserved for the pre-formatted certificate chain.
pub const MAX_CERT_FORMAT_LEN: usize = 2048;

/// Signature algorithms the server offers to the certificate provider.
pub const SIGNATURE_ALGORITHMS: &[u16] = &[0x0804];

/// How the security configuration obtains and checks certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SecConfigFlags(pub u32);

impl SecConfigFlags {
    /// No certificate at all.
    pub const CERTIFICATE_NULL: Self = Self(0x0000_0000);
    pub const CERTIFICATE_CONTEXT: Self = Self(0x0000_0004);
    /// Load from a file. Not supported here.
    pub const CERTIFICATE_FILE: Self = Self(0x0000_0008);
    /// Client side: accept any server certificate.
    pub const DISABLE_CERT_VALIDATION: Self = Self(0x8000_0000);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SecConfigFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A peer certificate chain as parsed by a [`CertificateProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateChain<'a> {
    raw: &'a [u8],
}

impl<'a> CertificateChain<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Certificate operations the handshake delegates.
pub trait CertificateProvider: Send + Sync {
    /// Pick one of the offered signature algorithms, if any is usable.
    fn select_signature(&self, offered: &[u16]) -> Option<u16>;

    /// Write the local certificate chain into `out`, returning its length.
    fn format_chain(&self, out: &mut [u8]) -> Result<usize, Error>;

    /// Parse a chain received from the peer.
    fn parse_chain<'a>(&self, data: &'a [u8]) -> Result<CertificateChain<'a>, Error>;

    /// Check a parsed chain against the expected server name.
    fn validate_chain(
        &self,
        chain: &CertificateChain<'_>,
        server_name: Option<&str>,
        flags: SecConfigFlags,
    ) -> bool;
}

/// The provider behind `CERTIFICATE_NULL`.
///
/// Accepts the first offered algorithm, sends an empty chain, parses
/// anything, and never validates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCertificate;

impl CertificateProvider for NullCertificate {
    fn select_signature(&self, offered: &[u16]) -> Option<u16> {
        offered.first().copied()
    }

    fn format_chain(&self, _out: &mut [u8]) -> Result<usize, Error> {
        Ok(0)
    }

    fn parse_chain<'a>(&self, data: &'a [u8]) -> Result<CertificateChain<'a>, Error> {
        Ok(CertificateChain::new(data))
    }

    fn validate_chain(
        &self,
        _chain: &CertificateChain<'_>,
        _server_name: Option<&str>,
        _flags: SecConfigFlags,
    ) -> bool {
        false
    }
}

/// Where a security configuration gets its certificate.
#[derive(Clone)]
pub enum CertificateSource {
    Null,
    /// A certificate file path. Rejected with `InvalidParameter`.
    File,
    Provider(Arc<dyn CertificateProvider>),
}

impl fmt::Debug for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateSource::Null => f.write_str("Null"),
            CertificateSource::File => f.write_str("File"),
            CertificateSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// Shared security configuration.
pub struct SecConfig {
    flags: SecConfigFlags,
    provider: Arc<dyn CertificateProvider>,
    /// Chain formatted once at creation; sent in every ServerHandshake.
    formatted_chain: heapless::Vec<u8, MAX_CERT_FORMAT_LEN>,
    _rundown: Option<RundownGuard>,
}

impl SecConfig {
    /// Create a server configuration under `rundown`.
    ///
    /// Fails with `InvalidState` once the rundown has begun shutting down,
    /// and with `InvalidParameter` for file certificates or a
    /// `CERTIFICATE_CONTEXT` flag without a provider.
    pub fn server(
        rundown: &RundownRef,
        flags: SecConfigFlags,
        source: CertificateSource,
    ) -> Result<Arc<Self>, Error> {
        let guard = rundown.acquire().ok_or_else(|| {
            tracing::error!("failed to acquire sec config rundown");
            Error::InvalidState
        })?;

        let provider = resolve_provider(flags, source)?;

        let mut scratch = [0u8; MAX_CERT_FORMAT_LEN];
        let len = provider.format_chain(&mut scratch)?;
        let formatted_chain = heapless::Vec::from_slice(scratch.get(..len).ok_or(Error::InvalidParameter)?)
            .map_err(|_| Error::InvalidParameter)?;

        tracing::debug!(flags = flags.bits(), chain_len = len, "server sec config created");
        Ok(Arc::new(Self {
            flags,
            provider,
            formatted_chain,
            _rundown: Some(guard),
        }))
    }

    /// Create a client configuration.
    pub fn client(flags: SecConfigFlags, source: CertificateSource) -> Arc<Self> {
        let provider = match source {
            CertificateSource::Provider(provider) => provider,
            CertificateSource::Null | CertificateSource::File => Arc::new(NullCertificate),
        };
        tracing::debug!(flags = flags.bits(), "client sec config created");
        Arc::new(Self {
            flags,
            provider,
            formatted_chain: heapless::Vec::new(),
            _rundown: None,
        })
    }

    pub fn flags(&self) -> SecConfigFlags {
        self.flags
    }

    pub fn provider(&self) -> &dyn CertificateProvider {
        self.provider.as_ref()
    }

    pub fn formatted_chain(&self) -> &[u8] {
        &self.formatted_chain
    }

    pub fn validation_disabled(&self) -> bool {
        self.flags.contains(SecConfigFlags::DISABLE_CERT_VALIDATION)
    }
}

fn resolve_provider(
    flags: SecConfigFlags,
    source: CertificateSource,
) -> Result<Arc<dyn CertificateProvider>, Error> {
    if flags.contains(SecConfigFlags::CERTIFICATE_FILE) {
        return Err(Error::InvalidParameter);
    }
    match source {
        CertificateSource::File => Err(Error::InvalidParameter),
        CertificateSource::Null if flags.contains(SecConfigFlags::CERTIFICATE_CONTEXT) => {
            Err(Error::InvalidParameter)
        }
        CertificateSource::Null => Ok(Arc::new(NullCertificate)),
        CertificateSource::Provider(provider) => Ok(provider),
    }
}

impl fmt::Debug for SecConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecConfig")
            .field("flags", &self.flags)
            .field("formatted_chain_len", &self.formatted_chain.len())
            .finish_non_exhaustive()
    }
}

impl Drop for SecConfig {
    fn drop(&mut self) {
        tracing::debug!(flags = self.flags.bits(), "sec config released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedChain(&'static [u8]);

    impl CertificateProvider for FixedChain {
        fn select_signature(&self, offered: &[u16]) -> Option<u16> {
            offered.iter().copied().find(|&alg| alg == 0x0804)
        }

        fn format_chain(&self, out: &mut [u8]) -> Result<usize, Error> {
            out[..self.0.len()].copy_from_slice(self.0);
            Ok(self.0.len())
        }

        fn parse_chain<'a>(&self, data: &'a [u8]) -> Result<CertificateChain<'a>, Error> {
            Ok(CertificateChain::new(data))
        }

        fn validate_chain(
            &self,
            chain: &CertificateChain<'_>,
            _server_name: Option<&str>,
            _flags: SecConfigFlags,
        ) -> bool {
            chain.as_bytes() == self.0
        }
    }

    #[test]
    fn null_server_config_has_empty_chain() {
        let rundown = RundownRef::new();
        let config =
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_NULL, CertificateSource::Null)
                .unwrap();
        assert!(config.formatted_chain().is_empty());
        assert_eq!(config.provider().select_signature(SIGNATURE_ALGORITHMS), Some(0x0804));
    }

    #[test]
    fn provider_chain_is_formatted_once() {
        let rundown = RundownRef::new();
        let config = SecConfig::server(
            &rundown,
            SecConfigFlags::CERTIFICATE_CONTEXT,
            CertificateSource::Provider(Arc::new(FixedChain(b"chain"))),
        )
        .unwrap();
        assert_eq!(config.formatted_chain(), b"chain");
    }

    #[test]
    fn file_certificates_rejected() {
        let rundown = RundownRef::new();
        assert_eq!(
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_FILE, CertificateSource::File)
                .map(|_| ()),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_NULL, CertificateSource::File)
                .map(|_| ()),
            Err(Error::InvalidParameter)
        );
        // The failed attempts hold no reference.
        assert_eq!(rundown.active(), 0);
    }

    #[test]
    fn context_flag_requires_provider() {
        let rundown = RundownRef::new();
        assert_eq!(
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_CONTEXT, CertificateSource::Null)
                .map(|_| ()),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn server_config_holds_rundown_until_last_clone() {
        let rundown = RundownRef::new();
        let config =
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_NULL, CertificateSource::Null)
                .unwrap();
        let second = config.clone();
        assert_eq!(rundown.active(), 1);
        drop(config);
        assert_eq!(rundown.active(), 1);
        drop(second);
        assert_eq!(rundown.active(), 0);
    }

    #[test]
    fn server_config_after_shutdown_fails() {
        let rundown = RundownRef::new();
        rundown.wait_for_rundown();
        assert_eq!(
            SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_NULL, CertificateSource::Null)
                .map(|_| ()),
            Err(Error::InvalidState)
        );
    }

    #[test]
    fn client_config_flags() {
        let config = SecConfig::client(
            SecConfigFlags::CERTIFICATE_NULL | SecConfigFlags::DISABLE_CERT_VALIDATION,
            CertificateSource::Null,
        );
        assert!(config.validation_disabled());
        let config = SecConfig::client(SecConfigFlags::CERTIFICATE_NULL, CertificateSource::Null);
        assert!(!config.validation_disabled());
    }

    #[test]
    fn null_certificate_never_validates() {
        let chain = NullCertificate.parse_chain(b"anything").unwrap();
        assert_eq!(chain.as_bytes(), b"anything");
        assert!(!NullCertificate.validate_chain(&chain, Some("host"), SecConfigFlags::default()));
        assert_eq!(NullCertificate.select_signature(&[]), None);
    }
}
