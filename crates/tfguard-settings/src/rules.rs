use crate::error::LoadError;
use crate::model::{ConditionDef, NotDef, RuleDef, RuleDocumentV1, TfguardConfigV1};
use std::collections::BTreeSet;
use tfguard_domain::{Condition, Rule, RuleError, RuleOrigin, RuleSource};
use tfguard_types::{Severity, ids};

/// Serialization format of a rule document, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    Toml,
    Json,
    Yaml,
}

impl DocFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())?;
        match ext.as_str() {
            "toml" => Some(DocFormat::Toml),
            "json" => Some(DocFormat::Json),
            "yaml" | "yml" => Some(DocFormat::Yaml),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocFormat::Toml => "TOML",
            DocFormat::Json => "JSON",
            DocFormat::Yaml => "YAML",
        }
    }
}

/// Parse one rule document into a rule source. Every rule is validated; the first invalid rule
/// or repeated id fails the whole document.
pub fn parse_rules(text: &str, format: DocFormat, origin: RuleOrigin) -> Result<RuleSource, LoadError> {
    let file = origin_file(&origin);
    let syntax = |message: String| LoadError::Syntax {
        file: file.clone(),
        format: format.as_str(),
        message,
    };

    let doc: RuleDocumentV1 = match format {
        DocFormat::Toml => toml::from_str(text).map_err(|e| syntax(e.to_string()))?,
        DocFormat::Json => serde_json::from_str(text).map_err(|e| syntax(e.to_string()))?,
        DocFormat::Yaml => {
            if text.trim().is_empty() {
                RuleDocumentV1::default()
            } else {
                serde_yaml::from_str(text).map_err(|e| syntax(e.to_string()))?
            }
        }
    };

    if let Some(found) = doc.schema.as_deref()
        && found != ids::SCHEMA_RULES_V1
    {
        return Err(LoadError::Schema {
            file,
            found: found.to_string(),
            expected: ids::SCHEMA_RULES_V1,
        });
    }

    build_source(&doc.rules, origin)
}

/// The `[[rules]]` tables of the repository config as a rule source.
pub fn config_rules(cfg: &TfguardConfigV1, origin: RuleOrigin) -> Result<RuleSource, LoadError> {
    build_source(&cfg.rules, origin)
}

fn build_source(defs: &[RuleDef], origin: RuleOrigin) -> Result<RuleSource, LoadError> {
    let file = origin_file(&origin);
    let mut seen = BTreeSet::new();
    let mut rules = Vec::with_capacity(defs.len());

    for def in defs {
        let rule = build_rule(def, origin.clone()).map_err(|error| LoadError::InvalidRule {
            file: file.clone(),
            rule_id: def.id.clone(),
            error,
        })?;
        if !seen.insert(rule.id.clone()) {
            return Err(LoadError::DuplicateId {
                file,
                rule_id: rule.id,
            });
        }
        rules.push(rule);
    }

    Ok(RuleSource::new(origin, rules))
}

fn origin_file(origin: &RuleOrigin) -> String {
    origin
        .file
        .clone()
        .unwrap_or_else(|| origin.kind.as_str().to_string())
}

/// Turn a serialized rule into a validated domain rule.
pub fn build_rule(def: &RuleDef, origin: RuleOrigin) -> Result<Rule, RuleError> {
    let condition = build_condition(&def.condition)?;
    let mut rule = Rule::new(&def.id, condition)?
        .with_resource_types(def.resource_types.iter().map(|t| t.trim().to_string()))
        .with_tags(def.tags.iter().cloned())
        .with_origin(origin);

    if let Some(name) = def.name.as_deref() {
        rule = rule.with_name(name);
    }
    if let Some(description) = def.description.as_deref() {
        rule = rule.with_description(description);
    }
    if let Some(severity) = def.severity.as_deref() {
        let severity: Severity = severity
            .parse()
            .map_err(|_| RuleError::UnknownSeverity(severity.to_string()))?;
        rule = rule.with_severity(severity);
    }
    if let Some(effect) = def.effect.as_deref() {
        rule = rule.with_effect(effect.parse()?);
    }
    if let Some(message) = def.message.as_deref() {
        rule = rule.with_message(message)?;
    }
    if let Some(remediation) = def.remediation.as_deref() {
        rule = rule.with_remediation(remediation);
    }
    Ok(rule)
}

/// Turn a serialized condition node into a validated condition tree.
pub fn build_condition(def: &ConditionDef) -> Result<Condition, RuleError> {
    let set: Vec<&str> = [
        ("all", def.all.is_some()),
        ("any", def.any.is_some()),
        ("not", def.not.is_some()),
        ("path", def.path.is_some()),
    ]
    .into_iter()
    .filter_map(|(key, present)| present.then_some(key))
    .collect();

    if set.len() != 1 {
        let found = if set.is_empty() {
            "none set".to_string()
        } else {
            format!("found {}", set.join(", "))
        };
        return Err(RuleError::ConditionShape(found));
    }
    if def.path.is_none() && (def.op.is_some() || def.value.is_some()) {
        return Err(RuleError::ConditionShape(
            "'op' and 'value' belong to a path predicate".to_string(),
        ));
    }

    if let Some(children) = &def.all {
        return Condition::all(build_children(children)?);
    }
    if let Some(children) = &def.any {
        return Condition::any(build_children(children)?);
    }
    if let Some(not) = &def.not {
        let children = match not {
            NotDef::One(child) => vec![build_condition(child)?],
            NotDef::Many(children) => build_children(children)?,
        };
        return Condition::not(children);
    }

    let path = def.path.as_deref().unwrap_or_default();
    let op = def.op.as_deref().unwrap_or("exists");
    Condition::predicate(path, op, def.value.clone())
}

fn build_children(defs: &[ConditionDef]) -> Result<Vec<Condition>, RuleError> {
    defs.iter().map(build_condition).collect()
}
