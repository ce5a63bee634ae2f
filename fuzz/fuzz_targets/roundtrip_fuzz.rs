#![no_main]
use libfuzzer_sys::fuzz_target;
use dvpl::codec;

fuzz_target!(|data: &[u8]| {
    let packed = codec::encode(data).unwrap();
    assert!(packed.len() <= data.len() + dvpl::format::FOOTER_SIZE);
    let unpacked = codec::decode(&packed).unwrap();
    assert_eq!(unpacked, data);
});
