//! Config parsing, rule documents and run option resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod error;
mod model;
mod resolve;
mod rules;

pub use error::LoadError;
pub use model::{ConditionDef, NotDef, RuleDef, RuleDocumentV1, TfguardConfigV1};
pub use resolve::{DEFAULT_RESOURCE_GLOBS, Overrides, ResolvedConfig};
pub use rules::{DocFormat, build_condition, build_rule, config_rules, parse_rules};

/// Parse `tfguard.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<TfguardConfigV1> {
    let cfg: TfguardConfigV1 = toml::from_str(input)?;
    if let Some(schema) = cfg.schema.as_deref()
        && schema != tfguard_types::ids::SCHEMA_CONFIG_V1
    {
        anyhow::bail!(
            "unsupported config schema: {schema} (expected {})",
            tfguard_types::ids::SCHEMA_CONFIG_V1
        );
    }
    Ok(cfg)
}

/// Resolve the effective run options (config + CLI overrides).
pub fn resolve_config(cfg: &TfguardConfigV1, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
