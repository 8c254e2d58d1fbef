#![no_main]

use h2scope::config::types::ConfigFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let parsed: Option<ConfigFile> = toml::from_str(input).ok();
        let applied = h2scope::fuzzing::apply_config_from_toml(input);
        if applied.is_ok() {
            if let Some(config) = parsed {
                if let Some(capacity) = config.window_capacity {
                    debug_assert!(capacity > 0);
                }
                if let Some(multiplier) = config.reconnect.as_ref().and_then(|r| r.multiplier) {
                    debug_assert!(multiplier > 0);
                }
            }
        }
    }
});
