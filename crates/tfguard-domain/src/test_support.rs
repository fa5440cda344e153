use crate::condition::Condition;
use crate::model::Resource;
use crate::rule::Rule;
use serde_json::Value;
use tfguard_types::Severity;

pub fn resource(resource_type: &str, name: &str, attributes: Value) -> Resource {
    Resource::new(resource_type, name, attributes)
}

pub fn pred(path: &str, op: &str, operand: Option<Value>) -> Condition {
    Condition::predicate(path, op, operand).expect("valid predicate")
}

/// A rule that passes whenever the resource has a `name` attribute.
pub fn simple_rule(id: &str, severity: Severity) -> Rule {
    Rule::new(id, pred("name", "exists", None))
        .expect("valid rule")
        .with_severity(severity)
}

pub fn rule(id: &str, severity: Severity, types: &[&str], condition: Condition) -> Rule {
    Rule::new(id, condition)
        .expect("valid rule")
        .with_severity(severity)
        .with_resource_types(types.iter().copied())
}
