//! Stable identifiers: schema names and the process exit-code contract.

pub const TOOL_NAME: &str = "tfguard";

// Schemas
pub const SCHEMA_REPORT_V1: &str = "tfguard.report.v1";
pub const SCHEMA_CONFIG_V1: &str = "tfguard.config.v1";
pub const SCHEMA_RULES_V1: &str = "tfguard.rules.v1";

// Exit codes. These are part of the external contract and must not change.

/// No failing result at or above the severity threshold.
pub const EXIT_PASS: i32 = 0;
/// One or more failing results.
pub const EXIT_VIOLATIONS: i32 = 1;
/// Discovery, configuration or parse error (raised before a summary exists).
pub const EXIT_ERROR: i32 = 2;
