//! Fuzz session packet decoding: arbitrary type byte and payload.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use soupline_proto::SessionPacket;

fuzz_target!(|data: &[u8]| {
    let Some((&tag, payload)) = data.split_first() else {
        return;
    };

    let Ok(packet) = SessionPacket::decode(tag, &Bytes::copy_from_slice(payload)) else {
        return;
    };

    // Whatever decodes must survive a trip back through the framer.
    let frame = packet.to_frame();
    assert_eq!(frame.packet_type, tag);
    let again = SessionPacket::from_frame(&frame).expect("re-encoded packet decodes");
    assert_eq!(again, packet);
});
