#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = sessionvault::Config::from_toml_str(s) {
            // Effective TTLs must never be zero, whatever the input.
            assert!(!config.session.ttl().is_zero());
        }
    }
});
