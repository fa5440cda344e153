//! Stable DTOs and IDs used across the tfguard workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted summary/report
//! - stable schema IDs and exit codes
//! - canonical repo-relative path handling
//! - the rule listing record exposed to callers

#![forbid(unsafe_code)]

pub mod ids;
pub mod path;
pub mod report;

pub use path::RepoPath;
pub use report::{
    Location, ReportEnvelope, RuleInfo, RuleResult, Severity, SeverityCounts, Summary, ToolMeta,
};
