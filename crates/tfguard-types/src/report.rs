use crate::RepoPath;
use crate::ids;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Three-level, totally ordered severity: `Info < Warning < Error`.
///
/// Rule sources use different vocabularies; the aliases fold them onto the same order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "low", alias = "note")]
    Info,
    #[serde(alias = "warn", alias = "medium")]
    Warning,
    #[serde(alias = "high", alias = "critical")]
    Error,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "low" | "note" => Ok(Severity::Info),
            "warning" | "warn" | "medium" => Ok(Severity::Warning),
            "error" | "high" | "critical" => Ok(Severity::Error),
            other => Err(format!(
                "unknown severity: {other} (expected info|warning|error)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub path: RepoPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// Outcome of evaluating one rule against one resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleResult {
    pub rule_id: String,
    pub resource_type: String,
    pub resource_address: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Stable identifier intended for dedup and trending: a hash of `rule_id + resource_address`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Attribute paths that could not be resolved while strict unknowns were enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknowns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityCounts {
    pub info: u32,
    pub warning: u32,
    pub error: u32,
}

impl SeverityCounts {
    /// Count the failing results per severity.
    pub fn from_failures(results: &[RuleResult]) -> Self {
        let mut counts = SeverityCounts::default();
        for r in results.iter().filter(|r| !r.passed) {
            match r.severity {
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Error => counts.error += 1,
            }
        }
        counts
    }
}

/// Aggregated outcome of one run. Built once by the engine; read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    /// Pairs whose resource type matched but whose rule severity was below `min_severity`.
    pub skipped: u32,
    pub failed_by_severity: SeverityCounts,
    pub min_severity: Severity,
    pub resources_scanned: u32,
    pub rules_active: u32,
    pub exit_code: i32,
    pub results: Vec<RuleResult>,
}

impl Summary {
    /// Exit code derived from results: `1` if anything failed, else `0`.
    pub fn exit_code_for(results: &[RuleResult]) -> i32 {
        if results.iter().any(|r| !r.passed) {
            ids::EXIT_VIOLATIONS
        } else {
            ids::EXIT_PASS
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Listing record for the active rule catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleInfo {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub description: String,
    /// Where the winning definition was loaded from (`builtin`, a file path, ...).
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

/// Versioned report wrapper around a [`Summary`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope {
    /// Versioned schema identifier for the envelope shape.
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub summary: Summary,
}
