#![no_main]

use libfuzzer_sys::fuzz_target;
use quic_tls_stub::tls::extensions::{parse_client_initial_extensions, ExtensionIter};
use quic_tls_stub::tls::messages::{self, Message};

fuzz_target!(|data: &[u8]| {
    // Message and extension decoders must never panic on any input.
    let _ = messages::decode_header(data);

    if let Ok((msg, consumed)) = Message::decode(data) {
        assert!(consumed <= data.len());
        if let Message::ClientInitial(hello) = msg {
            let _ = parse_client_initial_extensions(hello.extensions);
        }
    }

    for entry in ExtensionIter::new(data) {
        if entry.is_err() {
            break;
        }
    }
});
