//! Fuzz the stream framer.
//!
//! The first byte picks a chunk size; the rest is the stream. Feeding it in
//! chunks must yield exactly what feeding it whole yields, and every frame
//! must re-encode to the bytes it was cut from.

#![no_main]

use libfuzzer_sys::fuzz_target;
use soupline_proto::FrameReader;

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);

    let mut whole = FrameReader::new();
    let expected = whole.feed(stream);

    let mut chunked = FrameReader::new();
    let mut frames = Vec::new();
    let mut failed = None;
    for piece in stream.chunks(chunk) {
        match chunked.feed(piece) {
            Ok(batch) => frames.extend(batch),
            Err(err) => {
                failed = Some(err);
                break;
            },
        }
    }

    match expected {
        Ok(expected) => {
            assert!(failed.is_none(), "chunking introduced {failed:?}");
            assert_eq!(frames, expected);
            assert_eq!(chunked.buffered(), whole.buffered());

            let mut offset = 0;
            for frame in &frames {
                let bytes = frame.to_bytes().expect("decoded frame re-encodes");
                assert_eq!(&stream[offset..offset + bytes.len()], bytes.as_ref());
                offset += bytes.len();
            }
        },
        Err(err) => assert_eq!(failed, Some(err)),
    }
});
