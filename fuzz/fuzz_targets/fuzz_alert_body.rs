#![no_main]

use libfuzzer_sys::fuzz_target;

use adapters::mail::parser::parse_alert_body;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = std::str::from_utf8(data) {
        // Malformed bodies must come back as errors, never panics.
        let _ = parse_alert_body(body);
    }
});
