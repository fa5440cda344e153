//! Repository adapters: discover inputs, load rule documents, extract resources.
//!
//! This crate is allowed to do filesystem IO. It never runs Terraform; plans are read as JSON
//! that something else already produced.

#![forbid(unsafe_code)]

mod discover;
mod extract;
mod load;

use anyhow::Context;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tfguard_domain::Resource;
use tfguard_types::RepoPath;

pub use discover::{Inputs, discover_inputs, is_spec_file};
pub use extract::{PlanJsonExtractor, ResourceExtractor};
pub use load::{FileRuleLoader, RuleSourceLoader, load_rule_sources};

/// Fuzz-friendly API for testing parsing robustness without filesystem access.
/// These functions are designed to never panic on any input.
pub mod fuzz {
    use super::*;

    /// Extract resources from arbitrary text as if it were a plan file.
    ///
    /// **Never panics** on any input.
    pub fn extract_resources(text: &str) -> anyhow::Result<usize> {
        let resources = PlanJsonExtractor.extract(&RepoPath::new("plan.json"), text)?;
        Ok(resources.len())
    }

    /// Parse arbitrary text as a rule document of the format implied by `file_name`.
    ///
    /// **Never panics** on any input.
    pub fn parse_rule_document(file_name: &str, text: &str) -> anyhow::Result<usize> {
        use tfguard_domain::{RuleOrigin, SourceKind};
        use tfguard_settings::{DocFormat, parse_rules};

        let format = DocFormat::from_path(file_name).context("unsupported extension")?;
        let source = parse_rules(text, format, RuleOrigin::file(SourceKind::Custom, file_name))?;
        Ok(source.rules.len())
    }

    /// Match resource globs against candidate paths without touching the filesystem.
    ///
    /// **Never panics** on any input.
    pub fn match_globs(patterns: &[String], candidates: &[String]) -> anyhow::Result<Vec<String>> {
        let set = discover::build_globset(patterns)?;
        Ok(candidates
            .iter()
            .filter(|c| set.is_match(c.as_str()))
            .cloned()
            .collect())
    }
}

/// Read and extract every discovered resource file.
///
/// Files are parsed in parallel; the result keeps file order. An address seen twice (in one file
/// or across files) is an error.
pub fn load_resources(
    inputs: &Inputs,
    extractor: &dyn ResourceExtractor,
) -> anyhow::Result<Vec<Resource>> {
    let per_file: Vec<Vec<Resource>> = inputs
        .resource_files
        .par_iter()
        .map(|file| {
            let rel = RepoPath::relative_to(&inputs.root, file);
            let text = std::fs::read_to_string(file).with_context(|| format!("read {file}"))?;
            extractor
                .extract(&rel, &text)
                .with_context(|| format!("extract resources from {rel}"))
        })
        .collect::<anyhow::Result<_>>()?;

    let mut seen: BTreeMap<String, RepoPath> = BTreeMap::new();
    let mut resources = Vec::new();
    for resource in per_file.into_iter().flatten() {
        let file = resource
            .location
            .as_ref()
            .map(|l| l.path.clone())
            .unwrap_or_default();
        if let Some(first) = seen.insert(resource.address.clone(), file.clone()) {
            anyhow::bail!(
                "duplicate resource address {} (in {} and {})",
                resource.address,
                first,
                file
            );
        }
        resources.push(resource);
    }
    Ok(resources)
}
