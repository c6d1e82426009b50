//! Non-cryptographic stand-ins for packet protection. TEST ONLY.
//!
//! These types let a transport run its encrypt/decrypt/mask paths end to
//! end without any real cryptography. They provide no confidentiality and
//! no integrity: "sealing" writes a fixed sentinel where the tag belongs,
//! "opening" only checks that the sentinel is there, and header
//! protection masks are all zero. Never use them to carry real traffic.

use crate::crypto::header_protection::SAMPLE_LEN;
use crate::crypto::{Aead, CryptoProvider, HeaderProtection, KeyedHash};
use crate::error::Error;

/// Sentinel written where an authentication tag would go.
pub const NO_ENCRYPTION_SENTINEL: u64 = 0xF0F1_F2F3_F4F5_F6F7;

/// Placeholder AEAD. TEST ONLY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAead;

impl Aead for PlaceholderAead {
    const NONCE_LEN: usize = 12;
    const TAG_LEN: usize = 16;

    fn seal_in_place(
        &self,
        _nonce: &[u8],
        _aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize, Error> {
        let total = Self::sealed_len(payload_len)?;
        if buf.len() < total {
            return Err(Error::BufferTooSmall { needed: total });
        }
        buf[payload_len..payload_len + 8].copy_from_slice(&NO_ENCRYPTION_SENTINEL.to_be_bytes());
        buf[payload_len + 8..total].fill(0);
        Ok(total)
    }

    fn open_in_place(
        &self,
        _nonce: &[u8],
        _aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize, Error> {
        if ciphertext_len < Self::TAG_LEN || buf.len() < ciphertext_len {
            return Err(Error::InvalidParameter);
        }
        let payload_len = ciphertext_len - Self::TAG_LEN;
        if buf[payload_len..payload_len + 8] != NO_ENCRYPTION_SENTINEL.to_be_bytes() {
            return Err(Error::InvalidParameter);
        }
        Ok(payload_len)
    }
}

/// Placeholder header protection: every mask is zero. TEST ONLY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderHeaderProtection;

impl HeaderProtection for PlaceholderHeaderProtection {
    fn mask(&self, _sample: &[u8]) -> [u8; 5] {
        [0u8; 5]
    }

    fn mask_batch(&self, samples: &[u8], out: &mut [u8]) {
        let len = (samples.len() / SAMPLE_LEN * SAMPLE_LEN).min(out.len());
        out[..len].fill(0);
    }
}

/// Placeholder keyed hash: output is all zero. TEST ONLY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderHash;

impl KeyedHash for PlaceholderHash {
    fn compute(&self, _input: &[u8], out: &mut [u8]) -> Result<(), Error> {
        out.fill(0);
        Ok(())
    }
}

/// Hands out placeholder primitives for any key. TEST ONLY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderProvider;

impl CryptoProvider for PlaceholderProvider {
    type Aead = PlaceholderAead;
    type HeaderProtection = PlaceholderHeaderProtection;
    type Hash = PlaceholderHash;

    fn aead(&self, _key: &[u8]) -> Result<PlaceholderAead, Error> {
        Ok(PlaceholderAead)
    }

    fn hash(&self, _salt: &[u8]) -> Result<PlaceholderHash, Error> {
        Ok(PlaceholderHash)
    }

    fn header_protection(&self, _key: &[u8]) -> Result<PlaceholderHeaderProtection, Error> {
        Ok(PlaceholderHeaderProtection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn seal_then_open() {
        let aead = PlaceholderProvider.aead(&[0u8; 16]).unwrap();
        let mut buf = [0u8; 64];
        buf[..5].copy_from_slice(b"hello");

        let sealed = aead.seal_in_place(&[0; 12], b"hdr", &mut buf, 5).unwrap();
        assert_eq!(sealed, 5 + 16);
        // Payload is left in the clear.
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(buf[5..21], hex!("f0f1f2f3f4f5f6f7 0000000000000000"));

        let opened = aead.open_in_place(&[0; 12], b"hdr", &mut buf, sealed).unwrap();
        assert_eq!(opened, 5);
    }

    #[test]
    fn sealed_len_overflow_is_buffer_too_small() {
        assert_eq!(PlaceholderAead::sealed_len(5), Ok(21));
        assert_eq!(
            PlaceholderAead::sealed_len(usize::MAX - 3),
            Err(Error::BufferTooSmall { needed: usize::MAX })
        );
        let mut buf = [0u8; 32];
        assert_eq!(
            PlaceholderAead.seal_in_place(&[0; 12], &[], &mut buf, usize::MAX),
            Err(Error::BufferTooSmall { needed: usize::MAX })
        );
    }

    #[test]
    fn open_without_sentinel_fails() {
        let mut buf = [0u8; 32];
        assert_eq!(
            PlaceholderAead.open_in_place(&[0; 12], &[], &mut buf, 32),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn open_short_input_fails() {
        let mut buf = [0u8; 8];
        assert_eq!(
            PlaceholderAead.open_in_place(&[0; 12], &[], &mut buf, 8),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn seal_needs_room_for_tag() {
        let mut buf = [0u8; 10];
        assert_eq!(
            PlaceholderAead.seal_in_place(&[0; 12], &[], &mut buf, 4),
            Err(Error::BufferTooSmall { needed: 20 })
        );
    }

    #[test]
    fn masks_are_zero() {
        let hp = PlaceholderProvider.header_protection(&[0u8; 16]).unwrap();
        assert_eq!(hp.mask(&[0xAB; 16]), [0u8; 5]);

        let samples = [0xCD; 32];
        let mut out = [0xFF; 32];
        hp.mask_batch(&samples, &mut out);
        assert_eq!(out, [0u8; 32]);
    }

    #[test]
    fn hash_output_is_zeroed() {
        let hash = PlaceholderProvider.hash(b"salt").unwrap();
        let mut out = [0x11; 20];
        hash.compute(b"input", &mut out).unwrap();
        assert_eq!(out, [0u8; 20]);
    }
}
