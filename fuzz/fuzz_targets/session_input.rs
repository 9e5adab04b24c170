//! Fuzz the session state machine with arbitrary inbound bytes.
//!
//! Whatever the exchange sends, the session must never panic and must count
//! exactly one inbound sequence number per sequenced packet it accepts.

#![no_main]

use libfuzzer_sys::fuzz_target;
use soupline_core::{Credentials, Session, SessionState};
use soupline_proto::{FrameReader, SessionPacket};

fuzz_target!(|data: &[u8]| {
    let mut session = Session::new();
    if session.connect(&Credentials::new("alice", "secret")).is_err() {
        return;
    }

    let mut reader = FrameReader::new();
    let Ok(frames) = reader.feed(data) else {
        return;
    };

    for frame in frames {
        let Ok(packet) = SessionPacket::from_frame(&frame) else {
            continue;
        };
        let sequenced = packet.is_sequenced();
        let before = (session.state(), session.expected_sequence());

        match session.handle_packet(packet) {
            Ok(_) if sequenced => {
                assert_eq!(before.0, SessionState::LoggedIn);
                assert_eq!(session.expected_sequence(), before.1.wrapping_add(1));
            },
            Ok(_) => {},
            Err(_) => assert_eq!((session.state(), session.expected_sequence()), before),
        }
    }
});
