#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(frame) = h2scope::fuzzing::decode_frame_input(input) {
            for sample in &frame.payload {
                debug_assert!(sample.value().is_finite());
            }
        }
    }
    if let Ok(samples) = h2scope::fuzzing::decode_history_input(data) {
        for sample in &samples {
            debug_assert!(sample.value().is_finite());
        }
    }
});
