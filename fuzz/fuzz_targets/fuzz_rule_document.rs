//! Fuzz target for rule document parsing in every supported format.
//!
//! Goal: parsing and condition building should **never panic**. Invalid documents are errors.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_rule_document
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        for name in ["rules.tfguard.toml", "rules.tfguard.json", "rules.tfguard.yaml"] {
            let _ = tfguard_repo::fuzz::parse_rule_document(name, text);
        }
    }
});
