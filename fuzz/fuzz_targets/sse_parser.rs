#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let chunk_len = usize::from(data[0] % 16).saturating_add(1);
    let payload = &data[1..];
    let whole = h2scope::fuzzing::parse_sse_input(payload, payload.len().max(1));
    let chunked = h2scope::fuzzing::parse_sse_input(payload, chunk_len);
    // A lone trailing `\r` is held back in both cases, so splitting never
    // changes the dispatched events.
    debug_assert_eq!(whole, chunked);
});
