//! Fuzz target: `decode_payload`
//!
//! The first two bytes pick a declared length (which may exceed the data,
//! the way a fragmented MQTT publish announces its total size); the rest is
//! the delivered payload.  Decoding must never panic, never read past the
//! declared length and never yield more than the buffer can hold.
//!
//! cargo fuzz run fuzz_payload_decode

#![no_main]

use dooropener::app::payload::{PAYLOAD_CAPACITY, decode_payload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((len, payload)) = data.split_first_chunk::<2>() else {
        return;
    };
    let declared = usize::from(u16::from_le_bytes(*len));

    if let Ok(text) = decode_payload::<PAYLOAD_CAPACITY>(payload, declared) {
        assert!(declared < PAYLOAD_CAPACITY);
        assert_eq!(text.as_str().as_bytes(), &payload[..declared]);
        assert_eq!(text.as_bytes_with_nul().last(), Some(&0));
    }
});
