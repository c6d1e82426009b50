use crate::error::Error;

/// Packet payload protection.
///
/// Both directions work in place on a caller buffer. A sealed payload
/// grows by [`TAG_LEN`](Aead::TAG_LEN) bytes; opening strips them again.
pub trait Aead {
    const NONCE_LEN: usize;
    /// Per-packet expansion.
    const TAG_LEN: usize;

    /// Protect `buf[..payload_len]`, appending the tag.
    ///
    /// Returns the sealed length, or `BufferTooSmall` when `buf` cannot
    /// hold the tag.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize, Error>;

    /// Unprotect `buf[..sealed_len]`, returning the payload length.
    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        sealed_len: usize,
    ) -> Result<usize, Error>;

    /// Length of `payload_len` bytes once sealed.
    ///
    /// `BufferTooSmall` when the sum does not fit in `usize`.
    fn sealed_len(payload_len: usize) -> Result<usize, Error> {
        payload_len
            .checked_add(Self::TAG_LEN)
            .ok_or(Error::BufferTooSmall { needed: usize::MAX })
    }
}
