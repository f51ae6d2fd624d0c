#![no_main]

use libfuzzer_sys::fuzz_target;

use application::dispatch::clear_event_from_payload;

fuzz_target!(|data: &[u8]| {
    let _ = clear_event_from_payload(data);
});
