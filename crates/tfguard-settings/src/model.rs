use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `tfguard.toml` schema v1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TfguardConfigV1 {
    /// Optional schema string for tooling (`tfguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Lowest severity evaluated: `info` (default), `warning`, `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<String>,

    /// When non-empty, only these rule ids run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Rule ids that never run. Wins over `include`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Disable the built-in catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_builtin: Option<bool>,

    /// Fail rules whose attribute paths do not resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_unknowns: Option<bool>,

    /// Path to an extra rule document, highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<String>,

    /// Worker threads (`0` = automatic).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Abort the evaluation after this many milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Globs selecting resource files when a directory is scanned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_globs: Vec<String>,

    /// Repository-level rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDef>,
}

/// Standalone rule document (`*.tfguard.toml`, custom rules file, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuleDocumentV1 {
    /// Optional schema string for tooling (`tfguard.rules.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// `info`, `warning` (default) or `error`; `low|medium|high|critical` are accepted too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// `require` (default): the condition describes compliance. `deny`: it describes a violation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<String>,

    pub condition: ConditionDef,

    /// Failure message template with `{{.key}}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Serialized condition node. Exactly one of `all`, `any`, `not` or `path` must be set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConditionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<ConditionDef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<ConditionDef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<NotDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// `not` accepts a single condition or a one-element list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NotDef {
    Many(Vec<ConditionDef>),
    One(Box<ConditionDef>),
}
