//! Fuzz target for plan/state/native resource extraction.
//!
//! Goal: extraction should **never panic** on any input.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_plan_extract
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = tfguard_repo::fuzz::extract_resources(text);
    }
});
