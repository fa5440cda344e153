//! Use case orchestration for tfguard.
//!
//! This crate provides the application layer: use cases that coordinate the domain, repo, and
//! render layers. It is intentionally thin and delegates heavy lifting to the appropriate layers.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod check;
mod report;
mod rules;

pub use check::{CheckInput, CheckOutput, parse_config, run_check};
pub use report::{
    parse_report_json, render_annotations, render_markdown, render_text, serialize_report,
    to_renderable,
};
pub use rules::{
    ExplainOutput, RulesInput, format_explanation, format_not_found, format_rule_list,
    load_ruleset, run_explain, run_list_rules,
};
