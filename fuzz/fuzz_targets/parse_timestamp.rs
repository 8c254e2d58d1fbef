#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(timestamp) = h2scope::fuzzing::parse_timestamp_input(input) {
            let rendered = timestamp.to_rfc3339();
            let reparsed = h2scope::fuzzing::parse_timestamp_input(&rendered);
            debug_assert!(reparsed.is_ok_and(|value| value == timestamp));
        }
        if let Ok(kind) = h2scope::fuzzing::parse_metric_kind_input(input) {
            debug_assert!(h2scope::fuzzing::parse_metric_kind_input(kind.wire_id()).is_ok());
        }
    }
});
