#![no_main]

use libfuzzer_sys::fuzz_target;

// Serialized output must be a fixed point of parse -> serialize.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let once = html::serialize_document(&html::parse_document(input));
    let twice = html::serialize_document(&html::parse_document(&once));
    assert_eq!(once, twice);
});
