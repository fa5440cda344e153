//! Fuzz target for attribute path parsing and resolution.
//!
//! Goal: parsing a path and resolving it against a document should **never panic**.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_attr_path
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tfguard_domain::{AttrPath, resolve};

#[derive(Arbitrary, Debug)]
struct PathInput {
    path: String,
    /// JSON text for the attributes being resolved against.
    document: String,
}

fuzz_target!(|input: PathInput| {
    if input.path.len() > 512 || input.document.len() > 4096 {
        return;
    }

    let Ok(path) = AttrPath::parse(&input.path) else {
        return;
    };
    // Display must round-trip through the parser.
    let _ = AttrPath::parse(&path.to_string());

    if let Ok(doc) = serde_json::from_str::<serde_json::Value>(&input.document) {
        let _ = resolve(&doc, &path);
    }
});
