//! Fuzz OUCH record decoding in both directions.

#![no_main]

use libfuzzer_sys::fuzz_target;
use soupline_proto::{ClientMessage, ExchangeMessage};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = ClientMessage::parse(data) {
        let bytes = message.encode().expect("decoded client message re-encodes");
        assert_eq!(bytes.len(), data.len());
        assert_eq!(ClientMessage::parse(&bytes).expect("re-encoded message decodes"), message);
    }

    if let Ok(message) = ExchangeMessage::parse(data) {
        let bytes = message.encode().expect("decoded exchange message re-encodes");
        assert_eq!(bytes.len(), data.len());
        assert_eq!(ExchangeMessage::parse(&bytes).expect("re-encoded message decodes"), message);
    }
});
