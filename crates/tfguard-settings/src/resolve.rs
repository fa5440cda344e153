use crate::model::TfguardConfigV1;
use anyhow::Context;
use globset::Glob;
use std::time::{Duration, Instant};
use tfguard_domain::{EvalOptions, Selection};
use tfguard_types::Severity;

pub const DEFAULT_RESOURCE_GLOBS: [&str; 3] = [
    "**/*.tfplan.json",
    "**/plan.json",
    "**/*.tfguard-resources.json",
];

/// CLI-level overrides. `Some` wins over the config file; lists replace rather than append.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub min_severity: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub no_builtin: Option<bool>,
    pub strict_unknowns: Option<bool>,
    pub custom_rules: Option<String>,
    pub jobs: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Effective options for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub min_severity: Severity,
    pub selection: Selection,
    pub no_builtin: bool,
    pub strict_unknowns: bool,
    pub custom_rules: Option<String>,
    pub jobs: usize,
    pub timeout: Option<Duration>,
    pub resource_globs: Vec<String>,
}

impl ResolvedConfig {
    /// Engine options. The deadline, if any, starts counting now.
    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            min_severity: self.min_severity,
            strict_unknowns: self.strict_unknowns,
            jobs: self.jobs,
            deadline: self.timeout.map(|t| Instant::now() + t),
            ..EvalOptions::default()
        }
    }
}

pub fn resolve_config(cfg: &TfguardConfigV1, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    let min_severity = match overrides.min_severity.as_deref().or(cfg.min_severity.as_deref()) {
        Some(s) => s
            .parse::<Severity>()
            .map_err(anyhow::Error::msg)
            .context("invalid min_severity")?,
        None => Severity::Info,
    };

    let include = overrides.include.unwrap_or_else(|| cfg.include.clone());
    let exclude = overrides.exclude.unwrap_or_else(|| cfg.exclude.clone());

    let resource_globs = if cfg.resource_globs.is_empty() {
        DEFAULT_RESOURCE_GLOBS.iter().map(|s| s.to_string()).collect()
    } else {
        cfg.resource_globs.clone()
    };
    validate_globs(&resource_globs)?;

    let timeout = match overrides.timeout_ms.or(cfg.timeout_ms) {
        Some(0) | None => None,
        Some(ms) => Some(Duration::from_millis(ms)),
    };

    Ok(ResolvedConfig {
        min_severity,
        selection: Selection::new(
            include.iter().map(|s| s.trim()),
            exclude.iter().map(|s| s.trim()),
        ),
        no_builtin: overrides.no_builtin.or(cfg.no_builtin).unwrap_or(false),
        strict_unknowns: overrides
            .strict_unknowns
            .or(cfg.strict_unknowns)
            .unwrap_or(false),
        custom_rules: overrides.custom_rules.or_else(|| cfg.custom_rules.clone()),
        jobs: overrides.jobs.or(cfg.jobs).unwrap_or(0),
        timeout,
        resource_globs,
    })
}

fn validate_globs(patterns: &[String]) -> anyhow::Result<()> {
    for pattern in patterns {
        Glob::new(pattern).with_context(|| format!("invalid resource glob: {pattern}"))?;
    }
    Ok(())
}
