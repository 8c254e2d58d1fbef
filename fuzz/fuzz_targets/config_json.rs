#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(data).ok();
    let applied = h2scope::fuzzing::apply_config_from_json(data);
    if applied.is_ok() {
        debug_assert!(parsed.is_some());
    }
});
