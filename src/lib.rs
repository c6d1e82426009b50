#![forbid(unsafe_code)]
//! Stub TLS handshake engine for QUIC.
//!
//! Negotiates transport parameters and activates per-level packet keys
//! with a TLS-shaped message exchange that carries no real cryptography.
//! Intended for exercising a QUIC transport without a full TLS stack.

pub mod buf;
pub mod error;
pub mod rundown;
pub mod transport;

pub mod crypto;
pub mod tls;

pub use crypto::{Level, PacketKey};
pub use error::Error;
pub use rundown::{RundownGuard, RundownRef};
pub use tls::config::{CertificateProvider, CertificateSource, SecConfig, SecConfigFlags};
pub use tls::handshake::{HandshakeConfig, HandshakeContext, HandshakeState, Processed, Role};
pub use tls::session::TlsSession;
pub use tls::state::ProcessState;
pub use tls::ResultFlags;
pub use transport::{Rng, TransportHooks};
