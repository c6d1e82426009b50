//! Fixed-capacity, append-only output buffer for handshake bytes.
//!
//! `OutputBuffer<N>` is backed by `heapless::Vec<u8, N>` (inline storage).
//! It tracks two coordinates: the bytes still pending in the buffer, and
//! the total number of bytes ever written. Encryption-level boundaries
//! are recorded in the total coordinate so they stay valid after the
//! transport drains bytes it has already sent.

use crate::error::Error;

/// Append-only handshake output with named encryption-level offsets.
#[derive(Debug, Default)]
pub struct OutputBuffer<const N: usize> {
    data: heapless::Vec<u8, N>,
    total_len: usize,
    offset_handshake: usize,
    offset_one_rtt: usize,
}

impl<const N: usize> OutputBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: heapless::Vec::new(),
            total_len: 0,
            offset_handshake: 0,
            offset_one_rtt: 0,
        }
    }

    /// Bytes written and not yet drained.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Room left before the buffer is full.
    pub fn remaining(&self) -> usize {
        N - self.data.len()
    }

    /// Total bytes ever written, including drained ones.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Total-length position where Handshake-level data begins.
    pub fn offset_handshake(&self) -> usize {
        self.offset_handshake
    }

    /// Total-length position where 1-RTT data begins.
    pub fn offset_one_rtt(&self) -> usize {
        self.offset_one_rtt
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Fail unless `len` more bytes fit.
    pub fn ensure_room(&self, len: usize) -> Result<(), Error> {
        if len > self.remaining() {
            return Err(Error::BufferTooSmall {
                needed: self.data.len() + len,
            });
        }
        Ok(())
    }

    /// Append exactly `len` bytes produced by `write`.
    ///
    /// The tail is zero-filled before `write` runs. If room is short or
    /// `write` fails, the buffer is left as it was.
    pub fn append_with<F>(&mut self, len: usize, write: F) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, Error>,
    {
        self.ensure_room(len)?;
        let start = self.data.len();
        self.data
            .resize(start + len, 0)
            .map_err(|_| Error::BufferTooSmall { needed: start + len })?;
        match write(&mut self.data[start..]) {
            Ok(written) if written == len => {
                self.total_len += len;
                Ok(())
            }
            Ok(_) => {
                self.data.truncate(start);
                Err(Error::InvalidState)
            }
            Err(e) => {
                self.data.truncate(start);
                Err(e)
            }
        }
    }

    /// Record that everything written so far precedes Handshake-level data.
    pub fn mark_handshake(&mut self) {
        self.offset_handshake = self.total_len;
    }

    /// Record that everything written so far precedes 1-RTT data.
    pub fn mark_one_rtt(&mut self) {
        self.offset_one_rtt = self.total_len;
    }

    /// Drop `n` bytes from the front after the transport has sent them.
    pub fn drain(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.copy_within(n.., 0);
        self.data.truncate(self.data.len() - n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(byte: u8) -> impl FnOnce(&mut [u8]) -> Result<usize, Error> {
        move |out| {
            out.fill(byte);
            Ok(out.len())
        }
    }

    #[test]
    fn append_tracks_total_and_remaining() {
        let mut buf = OutputBuffer::<16>::new();
        buf.append_with(8, fill(0xAA)).unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.total_len(), 8);
        assert_eq!(buf.remaining(), 8);
        assert_eq!(buf.as_slice(), &[0xAA; 8]);
    }

    #[test]
    fn overflow_writes_nothing() {
        let mut buf = OutputBuffer::<8>::new();
        buf.append_with(4, fill(1)).unwrap();
        let err = buf.append_with(5, fill(2)).unwrap_err();
        assert_eq!(err, Error::BufferTooSmall { needed: 9 });
        assert_eq!(buf.as_slice(), &[1; 4]);
        assert_eq!(buf.total_len(), 4);
    }

    #[test]
    fn failed_writer_rolls_back() {
        let mut buf = OutputBuffer::<8>::new();
        let err = buf
            .append_with(4, |_| Err(Error::Framing))
            .unwrap_err();
        assert_eq!(err, Error::Framing);
        assert!(buf.is_empty());
        assert_eq!(buf.total_len(), 0);
    }

    #[test]
    fn drain_keeps_offsets_in_total_coordinates() {
        let mut buf = OutputBuffer::<32>::new();
        buf.append_with(8, fill(1)).unwrap();
        buf.mark_handshake();
        buf.append_with(8, fill(2)).unwrap();
        buf.mark_one_rtt();

        buf.drain(10);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.as_slice(), &[2; 6]);
        assert_eq!(buf.total_len(), 16);
        assert_eq!(buf.offset_handshake(), 8);
        assert_eq!(buf.offset_one_rtt(), 16);

        // Over-draining just empties the buffer.
        buf.drain(100);
        assert!(buf.is_empty());
        assert_eq!(buf.total_len(), 16);
    }
}
