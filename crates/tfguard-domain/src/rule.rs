use crate::condition::{Condition, Evaluation};
use crate::error::RuleError;
use crate::model::Resource;
use crate::template::MessageTemplate;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tfguard_types::{RuleInfo, Severity};

/// How a condition match translates into a verdict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    /// The condition describes the compliant state: a match passes.
    #[default]
    Require,
    /// The condition describes the violation: a match fails.
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Require => "require",
            Effect::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "require" => Ok(Effect::Require),
            "deny" => Ok(Effect::Deny),
            other => Err(RuleError::UnknownEffect(other.to_string())),
        }
    }
}

/// Rule source kinds in ascending precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Builtin,
    RepoConfig,
    SpecFile,
    Custom,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Builtin => "builtin",
            SourceKind::RepoConfig => "config",
            SourceKind::SpecFile => "spec",
            SourceKind::Custom => "custom",
        }
    }
}

/// Where a rule definition was loaded from. Used for listings and diagnostics only.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleOrigin {
    pub kind: SourceKind,
    pub file: Option<String>,
}

impl RuleOrigin {
    pub fn builtin() -> Self {
        Self {
            kind: SourceKind::Builtin,
            file: None,
        }
    }

    pub fn file(kind: SourceKind, file: impl Into<String>) -> Self {
        Self {
            kind,
            file: Some(file.into()),
        }
    }
}

impl Default for RuleOrigin {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", self.kind.as_str(), file),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// A validated rule. Fields are public for reading; construction goes through [`Rule::new`] so
/// the id and condition invariants hold.
#[derive(Clone, Debug)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// Exact-match type filter. Empty means every type.
    pub resource_types: BTreeSet<String>,
    pub condition: Condition,
    pub message: MessageTemplate,
    pub remediation: String,
    pub tags: BTreeSet<String>,
    pub effect: Effect,
    pub origin: RuleOrigin,
}

impl Rule {
    pub fn new(id: &str, condition: Condition) -> Result<Self, RuleError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RuleError::EmptyId);
        }
        condition.validate()?;
        Ok(Self {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            severity: Severity::Warning,
            resource_types: BTreeSet::new(),
            condition,
            message: MessageTemplate::default(),
            remediation: String::new(),
            tags: BTreeSet::new(),
            effect: Effect::Require,
            origin: RuleOrigin::builtin(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_resource_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_message(mut self, template: &str) -> Result<Self, RuleError> {
        self.message = MessageTemplate::parse(template)?;
        Ok(self)
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_origin(mut self, origin: RuleOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.resource_types.is_empty() || self.resource_types.contains(resource_type)
    }

    /// Translate an evaluation into pass/fail. Unknowns always fail.
    pub fn verdict(&self, evaluation: &Evaluation) -> bool {
        if evaluation.undetermined {
            return false;
        }
        match self.effect {
            Effect::Require => evaluation.matched,
            Effect::Deny => !evaluation.matched,
        }
    }

    /// Result message: the rule name on pass, the rendered template (plus unknowns) on failure.
    pub fn message_for(&self, resource: &Resource, passed: bool, unknowns: &[String]) -> String {
        if passed {
            return self.name.clone();
        }
        let mut msg = if self.message.is_empty() {
            let expectation = match self.effect {
                Effect::Require => "expected",
                Effect::Deny => "denied",
            };
            let subject = if self.name == self.id {
                self.id.clone()
            } else {
                format!("{} ({})", self.id, self.name)
            };
            format!(
                "{subject} failed for {}: {expectation} {}",
                resource.address, self.condition
            )
        } else {
            self.message.render(self, resource)
        };
        if !unknowns.is_empty() {
            msg.push_str(" (");
            msg.push_str(&unknowns.join("; "));
            msg.push(')');
        }
        msg
    }

    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            severity: self.severity,
            description: self.description.clone(),
            origin: self.origin.to_string(),
            resource_types: self.resource_types.iter().cloned().collect(),
            tags: self.tags.iter().cloned().collect(),
        }
    }
}
