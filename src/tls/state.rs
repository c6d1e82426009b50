//! Per-connection state the transport threads through `process_data`.

use crate::buf::OutputBuffer;
use crate::crypto::{KeySlots, Level};

/// Default output capacity for [`ProcessState`].
pub const DEFAULT_BUFFER_LEN: usize = 4096;

/// Caller-owned handshake progress.
///
/// The handshake appends outgoing bytes to `buffer` and installs keys
/// into `read_keys` / `write_keys`. `read_key` and `write_key` name the
/// level of the most recent install in each direction. Keys stay in
/// their slots until the transport takes them.
#[derive(Debug)]
pub struct ProcessState<const N: usize = DEFAULT_BUFFER_LEN> {
    pub buffer: OutputBuffer<N>,
    pub read_key: Level,
    pub write_key: Level,
    pub read_keys: KeySlots,
    pub write_keys: KeySlots,
    pub early_data_attempted: bool,
    pub early_data_accepted: bool,
    pub handshake_complete: bool,
}

impl<const N: usize> ProcessState<N> {
    pub fn new() -> Self {
        Self {
            buffer: OutputBuffer::new(),
            read_key: Level::Initial,
            write_key: Level::Initial,
            read_keys: KeySlots::new(),
            write_keys: KeySlots::new(),
            early_data_attempted: false,
            early_data_accepted: false,
            handshake_complete: false,
        }
    }

    pub(crate) fn install_read_key(&mut self, level: Level) {
        self.read_keys.install(level);
        self.read_key = level;
    }

    pub(crate) fn install_write_key(&mut self, level: Level) {
        self.write_keys.install(level);
        self.write_key = level;
    }
}

impl<const N: usize> Default for ProcessState<N> {
    fn default() -> Self {
        Self::new()
    }
}
