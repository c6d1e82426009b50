use crate::error::Error;

/// Keyed hash (HMAC-shaped) created from a salt.
///
/// The transport uses it for stateless tokens and connection-ID
/// derivation; the output length is chosen by the caller.
pub trait KeyedHash {
    /// Hash `input` into all of `out`.
    fn compute(&self, input: &[u8], out: &mut [u8]) -> Result<(), Error>;
}
