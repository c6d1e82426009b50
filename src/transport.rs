//! Interfaces the handshake engine needs from the transport layer.

/// Random bytes for the ClientInitial random.
///
/// Any source will do; nothing depends on the quality of the bytes.
pub trait Rng {
    /// Fill `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Callbacks into the connection that owns a handshake context.
pub trait TransportHooks {
    /// The peer's QUIC transport parameters, forwarded verbatim.
    ///
    /// Called at most once per handshake, from inside `process_data`.
    fn on_receive_transport_params(&mut self, params: &[u8]);
}

impl<F: FnMut(&[u8])> TransportHooks for F {
    fn on_receive_transport_params(&mut self, params: &[u8]) {
        self(params)
    }
}
