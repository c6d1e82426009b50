#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use quic_tls_stub::{
    CertificateSource, HandshakeConfig, HandshakeContext, ProcessState, Rng, Role, RundownRef,
    SecConfig, SecConfigFlags, TlsSession,
};

struct ZeroRng;

impl Rng for ZeroRng {
    fn fill(&mut self, buf: &mut [u8]) {
        buf.fill(0);
    }
}

fn drive(role: Role, sec_config: Arc<SecConfig>, mut input: &[u8]) {
    let config = HandshakeConfig {
        role,
        session: Arc::new(TlsSession::new(b"h3").unwrap()),
        sec_config,
        server_name: Some("localhost"),
        transport_params: &[1, 2, 3],
    };
    let mut ctx = HandshakeContext::new(config, |_: &[u8]| {}, &mut ZeroRng).unwrap();
    let mut state = ProcessState::<4096>::new();

    if role == Role::Client {
        ctx.process_data(&[], &mut state);
    }
    loop {
        let out = ctx.process_data(input, &mut state);
        assert!(out.consumed <= input.len());
        if out.consumed == 0 {
            break;
        }
        input = &input[out.consumed..];
        let pending = state.buffer.len();
        state.buffer.drain(pending);
    }
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary peer bytes must never panic either driver.
    let rundown = RundownRef::new();
    let server_config =
        SecConfig::server(&rundown, SecConfigFlags::CERTIFICATE_NULL, CertificateSource::Null)
            .unwrap();
    drive(Role::Server, server_config, data);

    let client_config = SecConfig::client(
        SecConfigFlags::CERTIFICATE_NULL | SecConfigFlags::DISABLE_CERT_VALIDATION,
        CertificateSource::Null,
    );
    drive(Role::Client, client_config, data);
});
