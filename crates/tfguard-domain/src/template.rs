//! `{{.key}}` message templates.
//!
//! Templates are parsed once at load time so an unknown key is reported against the rule that
//! declares it, not discovered halfway through a run.

use crate::error::RuleError;
use crate::model::Resource;
use crate::path::{AttrPath, resolve};
use crate::rule::Rule;
use serde_json::Value;
use std::fmt;

const UNKNOWN: &str = "<unknown>";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Key {
    ResourceName,
    ResourceType,
    ResourceAddress,
    RuleId,
    RuleName,
    Severity,
    File,
    Attribute(AttrPath),
}

impl Key {
    fn parse(raw: &str) -> Result<Self, RuleError> {
        let Some(name) = raw.strip_prefix('.') else {
            return Err(RuleError::Template(format!(
                "placeholder '{{{{{raw}}}}}' must start with '.'"
            )));
        };
        let key = match name {
            "resource_name" => Key::ResourceName,
            "resource_type" => Key::ResourceType,
            "resource_address" => Key::ResourceAddress,
            "rule_id" => Key::RuleId,
            "rule_name" => Key::RuleName,
            "severity" => Key::Severity,
            "file" => Key::File,
            other => match other.strip_prefix("attributes.") {
                Some(path) => Key::Attribute(AttrPath::parse(path)?),
                None => {
                    return Err(RuleError::Template(format!(
                        "unknown placeholder '{{{{.{other}}}}}'"
                    )));
                }
            },
        };
        Ok(key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Key(Key),
}

/// A parsed message template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageTemplate {
    source: String,
    parts: Vec<Part>,
}

impl MessageTemplate {
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let mut parts = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                parts.push(Part::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(RuleError::Template(format!(
                    "unterminated placeholder in '{source}'"
                )));
            };
            parts.push(Part::Key(Key::parse(after[..end].trim())?));
            rest = &after[end + 2..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn render(&self, rule: &Rule, resource: &Resource) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Key(key) => match key {
                    Key::ResourceName => out.push_str(&resource.name),
                    Key::ResourceType => out.push_str(&resource.resource_type),
                    Key::ResourceAddress => out.push_str(&resource.address),
                    Key::RuleId => out.push_str(&rule.id),
                    Key::RuleName => out.push_str(&rule.name),
                    Key::Severity => out.push_str(rule.severity.as_str()),
                    Key::File => out.push_str(resource.file().unwrap_or(UNKNOWN)),
                    Key::Attribute(path) => match resolve(&resource.attributes, path).first() {
                        Some(Value::String(s)) => out.push_str(s),
                        Some(v) => out.push_str(&v.to_string()),
                        None => out.push_str(UNKNOWN),
                    },
                },
            }
        }
        out
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
