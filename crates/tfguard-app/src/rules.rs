//! Building the active ruleset, plus the `rules` and `explain` use cases.

use anyhow::Context;
use camino::Utf8Path;
use tfguard_domain::{Rule, RuleOrigin, RuleSource, Ruleset, SourceKind, merge_sources};
use tfguard_repo::{FileRuleLoader, Inputs, load_rule_sources};
use tfguard_settings::{ResolvedConfig, TfguardConfigV1, config_rules};
use tfguard_types::RuleInfo;
use tracing::{debug, warn};

/// Everything needed to assemble the rules a run evaluates.
#[derive(Clone, Copy, Debug)]
pub struct RulesInput<'a> {
    pub inputs: &'a Inputs,
    pub config: &'a TfguardConfigV1,
    pub config_name: &'a str,
    pub resolved: &'a ResolvedConfig,
}

/// Load every rule source, merge by precedence and apply include/exclude.
///
/// Sources: the builtin catalog (unless disabled), `[[rules]]` from the config file, rule
/// documents next to resource files, then the custom rules file.
pub fn load_ruleset(input: &RulesInput<'_>) -> anyhow::Result<Ruleset> {
    let mut sources: Vec<RuleSource> = Vec::new();

    if input.resolved.no_builtin {
        debug!("builtin catalog disabled");
    } else {
        sources.push(tfguard_catalog::builtin_source().context("load builtin catalog")?);
    }

    let origin = RuleOrigin::file(SourceKind::RepoConfig, input.config_name);
    sources.push(config_rules(input.config, origin)?);

    let custom = input.resolved.custom_rules.as_deref().map(Utf8Path::new);
    sources.extend(load_rule_sources(input.inputs, custom, &FileRuleLoader)?);

    let merged = merge_sources(sources);
    for id in input.resolved.selection.unknown_ids(&merged) {
        warn!(rule_id = %id, "include/exclude names a rule that does not exist");
    }
    let ruleset = merged.select(&input.resolved.selection);
    debug!(rules = ruleset.len(), "ruleset assembled");
    Ok(ruleset)
}

/// `ListRules`: the active catalog in id order.
pub fn run_list_rules(ruleset: &Ruleset) -> Vec<RuleInfo> {
    ruleset.list()
}

/// Plain-text rule table.
pub fn format_rule_list(rules: &[RuleInfo]) -> String {
    let mut out = String::new();
    let width = rules.iter().map(|r| r.id.len()).max().unwrap_or(0);
    for r in rules {
        out.push_str(&format!(
            "{:<width$}  {:<7}  {}  [{}]\n",
            r.id,
            r.severity.as_str(),
            r.name,
            r.origin
        ));
    }
    out.push_str(&format!("\n{} rule(s)\n", rules.len()));
    out
}

/// Output from the explain use case.
#[derive(Clone, Debug)]
pub enum ExplainOutput {
    Found(Box<Rule>),
    /// Unknown identifier; includes the ids that do exist.
    NotFound {
        identifier: String,
        available: Vec<String>,
    },
}

/// Look up a rule by id.
pub fn run_explain(ruleset: &Ruleset, identifier: &str) -> ExplainOutput {
    match ruleset.get(identifier.trim()) {
        Some(rule) => ExplainOutput::Found(Box::new(rule.clone())),
        None => ExplainOutput::NotFound {
            identifier: identifier.to_string(),
            available: ruleset.ids().map(str::to_string).collect(),
        },
    }
}

/// Format a rule for terminal display.
pub fn format_explanation(rule: &Rule) -> String {
    let mut out = String::new();

    let title = format!("{} ({})", rule.name, rule.id);
    out.push_str(&title);
    out.push('\n');
    out.push_str(&"=".repeat(title.len()));
    out.push_str("\n\n");

    out.push_str(&format!("Severity:  {}\n", rule.severity));
    out.push_str(&format!("Effect:    {}\n", rule.effect.as_str()));
    if !rule.resource_types.is_empty() {
        let types: Vec<&str> = rule.resource_types.iter().map(String::as_str).collect();
        out.push_str(&format!("Resources: {}\n", types.join(", ")));
    }
    if !rule.tags.is_empty() {
        let tags: Vec<&str> = rule.tags.iter().map(String::as_str).collect();
        out.push_str(&format!("Tags:      {}\n", tags.join(", ")));
    }
    out.push_str(&format!("Source:    {}\n", rule.origin));
    out.push_str(&format!("Condition: {}\n", rule.condition));

    if !rule.description.is_empty() {
        out.push('\n');
        out.push_str(&rule.description);
        out.push('\n');
    }
    if !rule.remediation.is_empty() {
        out.push_str("\nRemediation\n-----------\n");
        out.push_str(&rule.remediation);
        out.push('\n');
    }

    out
}

/// Format the "not found" error message for terminal display.
pub fn format_not_found(identifier: &str, available: &[String]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Unknown rule id: {identifier}\n\n"));
    out.push_str("Available rule ids:\n");
    for id in available {
        out.push_str(&format!("  - {id}\n"));
    }

    out
}
