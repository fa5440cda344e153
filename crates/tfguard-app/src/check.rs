//! The `check` use case: evaluate the active rules against discovered resources.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tfguard_domain::CancelToken;
use tfguard_repo::{PlanJsonExtractor, discover_inputs, load_resources};
use tfguard_settings::{Overrides, ResolvedConfig, TfguardConfigV1};
use tfguard_types::{ReportEnvelope, ToolMeta, ids};
use time::OffsetDateTime;
use tracing::info;

use crate::rules::{RulesInput, load_ruleset};

/// Input for the check use case.
#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    /// Repository root path.
    pub repo_root: &'a Utf8Path,
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// Config file name as shown in rule origins.
    pub config_name: &'a str,
    /// Resource files or directories; empty means the repository root.
    pub paths: Vec<Utf8PathBuf>,
    /// CLI overrides.
    pub overrides: Overrides,
    /// Checked between resources; a cancelled run is an error.
    pub cancel: CancelToken,
}

/// Output from the check use case.
#[derive(Clone, Debug)]
pub struct CheckOutput {
    pub report: ReportEnvelope,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

impl CheckOutput {
    pub fn exit_code(&self) -> i32 {
        self.report.summary.exit_code
    }
}

/// Parse config text; empty text means defaults.
pub fn parse_config(config_text: &str) -> anyhow::Result<TfguardConfigV1> {
    if config_text.trim().is_empty() {
        Ok(TfguardConfigV1::default())
    } else {
        tfguard_settings::parse_config_toml(config_text).context("parse config")
    }
}

/// Run the check use case: resolve config, discover inputs, load rules and resources, evaluate.
pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckOutput> {
    let started_at = OffsetDateTime::now_utc();

    let cfg = parse_config(input.config_text)?;
    let resolved = tfguard_settings::resolve_config(&cfg, input.overrides.clone())
        .context("resolve config")?;

    let inputs = discover_inputs(input.repo_root, &input.paths, &resolved.resource_globs)
        .context("discover inputs")?;

    let ruleset = load_ruleset(&RulesInput {
        inputs: &inputs,
        config: &cfg,
        config_name: input.config_name,
        resolved: &resolved,
    })?;

    let resources = load_resources(&inputs, &PlanJsonExtractor).context("load resources")?;

    let mut options = resolved.eval_options();
    options.cancel = input.cancel.clone();
    let summary = tfguard_domain::run(&resources, &ruleset, &options).context("evaluate rules")?;

    info!(
        resources = summary.resources_scanned,
        rules = summary.rules_active,
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        "check finished"
    );

    let report = ReportEnvelope {
        schema: ids::SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: ids::TOOL_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        summary,
    };

    Ok(CheckOutput {
        report,
        resolved_config: resolved,
    })
}
