//! Fuzz target for resource glob matching.
//!
//! Goal: compiling and matching globs should **never panic** on any input.
//! Invalid patterns are errors.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_glob_match
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct GlobInput {
    /// Glob patterns (e.g., "**/*.tfplan.json", "envs/*/plan.json")
    patterns: Vec<String>,
    /// Candidate repo-relative paths
    candidates: Vec<String>,
}

fuzz_target!(|input: GlobInput| {
    if input.patterns.len() > 20 || input.candidates.len() > 100 {
        return;
    }

    let patterns: Vec<String> = input
        .patterns
        .into_iter()
        .filter(|p| p.len() <= 256)
        .collect();
    let candidates: Vec<String> = input
        .candidates
        .into_iter()
        .filter(|c| c.len() <= 512)
        .collect();

    let _ = tfguard_repo::fuzz::match_globs(&patterns, &candidates);
});
