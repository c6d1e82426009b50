/// Length of the ciphertext sample fed to header protection.
pub const SAMPLE_LEN: usize = 16;

/// Header protection cipher.
///
/// QUIC applies a mask to the first byte and packet number bytes of
/// each packet. The mask is derived from a 16-byte sample of the
/// encrypted payload.
pub trait HeaderProtection {
    /// Compute a 5-byte mask from a 16-byte sample.
    fn mask(&self, sample: &[u8]) -> [u8; 5];

    /// Compute masks for `samples.len() / SAMPLE_LEN` packets at once,
    /// writing `SAMPLE_LEN` bytes per sample into `out`.
    fn mask_batch(&self, samples: &[u8], out: &mut [u8]) {
        for (sample, chunk) in samples
            .chunks_exact(SAMPLE_LEN)
            .zip(out.chunks_exact_mut(SAMPLE_LEN))
        {
            chunk.fill(0);
            chunk[..5].copy_from_slice(&self.mask(sample));
        }
    }
}
