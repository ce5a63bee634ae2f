#![no_main]
use libfuzzer_sys::fuzz_target;
use dvpl::codec;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must only ever produce errors, never panics.
    let _ = codec::decode(data);

    // Same bytes behind a well-formed footer, so the LZ4 path gets exercised.
    if let Some((&kind, payload)) = data.split_first() {
        let footer = dvpl::format::Footer {
            original_size: (payload.len() as u32).wrapping_mul(3),
            compressed_size: payload.len() as u32,
            crc32: crc32fast::hash(payload),
            kind: u32::from(kind % 4),
        };
        let mut buf = payload.to_vec();
        buf.extend_from_slice(&footer.to_bytes());
        let _ = codec::decode(&buf);
    }
});
