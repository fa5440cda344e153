//! Condition trees and their evaluation against a single resource.
//!
//! A condition is either a leaf [`Predicate`] or a logical combinator over child conditions.
//! Every shape and operand is validated when the condition is built, so evaluation itself is
//! infallible: it returns a plain boolean plus, in strict mode, the list of unresolved paths.
//!
//! In strict mode an unresolved predicate is unknown rather than false. Combinators follow
//! three-valued logic: `Any` with a true branch is true and `All` with a false branch is false
//! whatever the unknowns, and `Not` of an unknown stays unknown.

use crate::error::RuleError;
use crate::model::Resource;
use crate::path::{AttrPath, resolve_traced};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Matches,
    GreaterThan,
    LessThan,
    OneOf,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Exists,
        Operator::NotExists,
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::Matches,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::OneOf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Exists => "exists",
            Operator::NotExists => "not_exists",
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Matches => "matches",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::OneOf => "one_of",
        }
    }

    pub fn names() -> String {
        Operator::ALL
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `exists`/`not_exists` only test presence.
    pub fn is_presence_test(self) -> bool {
        matches!(self, Operator::Exists | Operator::NotExists)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s.trim())
            .ok_or_else(|| RuleError::UnknownOperator(s.to_string()))
    }
}

/// Leaf test: resolve `path`, then apply `operator` to the resolved values.
#[derive(Clone, Debug)]
pub struct Predicate {
    path: AttrPath,
    operator: Operator,
    operand: Option<Value>,
    pattern: Option<Regex>,
}

impl Predicate {
    pub fn new(path: &str, operator: &str, operand: Option<Value>) -> Result<Self, RuleError> {
        let path = AttrPath::parse(path)?;
        let operator: Operator = operator.parse()?;
        let operand = operand.filter(|v| !v.is_null());

        let mut pattern = None;
        match (operator, &operand) {
            (op, Some(_)) if op.is_presence_test() => {
                return Err(RuleError::UnexpectedOperand {
                    operator: op.as_str(),
                });
            }
            (op, None) if op.is_presence_test() => {}
            (op, None) => {
                return Err(RuleError::MissingOperand {
                    operator: op.as_str(),
                });
            }
            (Operator::OneOf, Some(v)) if !v.is_array() => {
                return Err(invalid_operand(operator, "a list", v));
            }
            (Operator::GreaterThan | Operator::LessThan, Some(v)) if !v.is_number() => {
                return Err(invalid_operand(operator, "a numeric", v));
            }
            (Operator::Matches, Some(v)) => {
                let Some(src) = v.as_str() else {
                    return Err(invalid_operand(operator, "a string", v));
                };
                let re = Regex::new(src).map_err(|e| RuleError::InvalidPattern {
                    pattern: src.to_string(),
                    message: e.to_string(),
                })?;
                pattern = Some(re);
            }
            _ => {}
        }

        Ok(Self {
            path,
            operator,
            operand,
            pattern,
        })
    }

    pub fn path(&self) -> &AttrPath {
        &self.path
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand(&self) -> Option<&Value> {
        self.operand.as_ref()
    }

    fn test(&self, attributes: &Value, strict: bool, unknowns: &mut Vec<String>) -> Option<bool> {
        let resolution = resolve_traced(attributes, &self.path);
        let holds = match self.operator {
            Operator::Exists => !resolution.is_absent(),
            Operator::NotExists => resolution.is_absent(),
            _ if resolution.is_absent() => {
                if strict {
                    let at = resolution
                        .stopped_at
                        .and_then(|i| self.path.segments().get(i))
                        .map(|s| s.field.as_str())
                        .unwrap_or_default();
                    unknowns.push(format!(
                        "attribute '{}' is unknown (nothing at '{}')",
                        self.path, at
                    ));
                    return None;
                }
                false
            }
            _ => resolution.values.iter().any(|v| self.holds(v)),
        };
        Some(holds)
    }

    /// Apply the operator to one resolved value.
    fn holds(&self, value: &Value) -> bool {
        let Some(operand) = self.operand.as_ref() else {
            return true;
        };
        match self.operator {
            Operator::Exists | Operator::NotExists => true,
            Operator::Equals => values_equal(value, operand),
            Operator::NotEquals => !values_equal(value, operand),
            Operator::Contains => contains(value, operand) == Some(true),
            Operator::NotContains => contains(value, operand) == Some(false),
            Operator::Matches => match (&self.pattern, value.as_str()) {
                (Some(re), Some(s)) => re.is_match(s),
                _ => false,
            },
            Operator::GreaterThan => compare(value, operand).is_some_and(|(v, o)| v > o),
            Operator::LessThan => compare(value, operand).is_some_and(|(v, o)| v < o),
            Operator::OneOf => {
                let Some(choices) = operand.as_array() else {
                    return false;
                };
                match value {
                    Value::Array(items) => items
                        .iter()
                        .any(|item| choices.iter().any(|c| values_equal(item, c))),
                    _ => choices.iter().any(|c| values_equal(value, c)),
                }
            }
        }
    }
}

fn invalid_operand(operator: Operator, expected: &'static str, found: &Value) -> RuleError {
    RuleError::InvalidOperand {
        operator: operator.as_str(),
        expected,
        found: json_kind(found).to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Type-aware equality. Numbers compare numerically (`22 == 22.0`); a string never equals a number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// `Some(result)` when containment is defined for the value's type, `None` otherwise.
fn contains(haystack: &Value, needle: &Value) -> Option<bool> {
    match haystack {
        Value::String(s) => Some(needle.as_str().is_some_and(|n| s.contains(n))),
        Value::Array(items) => Some(items.iter().any(|i| values_equal(i, needle))),
        Value::Object(map) => Some(needle.as_str().is_some_and(|k| map.contains_key(k))),
        _ => None,
    }
}

fn compare(value: &Value, operand: &Value) -> Option<(f64, f64)> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some((v, operand.as_f64()?))
}

/// Recursive condition tree.
#[derive(Clone, Debug)]
pub enum Condition {
    Predicate(Predicate),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn predicate(path: &str, operator: &str, operand: Option<Value>) -> Result<Self, RuleError> {
        Predicate::new(path, operator, operand).map(Condition::Predicate)
    }

    pub fn all(children: Vec<Condition>) -> Result<Self, RuleError> {
        if children.is_empty() {
            return Err(RuleError::EmptyCombinator { kind: "all" });
        }
        Ok(Condition::All(children))
    }

    pub fn any(children: Vec<Condition>) -> Result<Self, RuleError> {
        if children.is_empty() {
            return Err(RuleError::EmptyCombinator { kind: "any" });
        }
        Ok(Condition::Any(children))
    }

    /// Build a `not` from a child list, which must hold exactly one condition.
    pub fn not(mut children: Vec<Condition>) -> Result<Self, RuleError> {
        match children.len() {
            1 => Ok(Condition::Not(Box::new(children.remove(0)))),
            n => Err(RuleError::NotArity(n)),
        }
    }

    /// Re-check the shape invariants of a tree that may have been built by hand.
    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            Condition::Predicate(_) => Ok(()),
            Condition::All(children) | Condition::Any(children) if children.is_empty() => {
                Err(RuleError::EmptyCombinator {
                    kind: if matches!(self, Condition::All(_)) {
                        "all"
                    } else {
                        "any"
                    },
                })
            }
            Condition::All(children) | Condition::Any(children) => {
                children.iter().try_for_each(Condition::validate)
            }
            Condition::Not(child) => child.validate(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Predicate(p) => match &p.operand {
                Some(v) => write!(f, "{} {} {}", p.path, p.operator, v),
                None => write!(f, "{} {}", p.path, p.operator),
            },
            Condition::All(children) | Condition::Any(children) => {
                let kind = if matches!(self, Condition::All(_)) {
                    "all"
                } else {
                    "any"
                };
                write!(f, "{kind}(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            Condition::Not(child) => write!(f, "not({child})"),
        }
    }
}

/// Result of evaluating a condition tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// False whenever the outcome is undetermined.
    pub matched: bool,
    /// The outcome hinged on an unresolved path (strict mode only).
    pub undetermined: bool,
    /// Unresolved paths seen while strict unknowns were enabled.
    pub unknowns: Vec<String>,
}

/// Evaluate `condition` against `resource` in lenient mode.
pub fn evaluate(resource: &Resource, condition: &Condition) -> bool {
    evaluate_with(resource, condition, false).matched
}

/// Evaluate with explicit strictness. Combinators short-circuit, so only predicates that were
/// actually reached can contribute unknowns.
pub fn evaluate_with(resource: &Resource, condition: &Condition, strict: bool) -> Evaluation {
    let mut unknowns = Vec::new();
    let outcome = eval_node(&resource.attributes, condition, strict, &mut unknowns);
    Evaluation {
        matched: outcome == Some(true),
        undetermined: outcome.is_none(),
        unknowns,
    }
}

/// `None` is unknown. Only strict mode produces it.
fn eval_node(
    attrs: &Value,
    condition: &Condition,
    strict: bool,
    unknowns: &mut Vec<String>,
) -> Option<bool> {
    match condition {
        Condition::Predicate(p) => p.test(attrs, strict, unknowns),
        Condition::All(children) => fold(children, false, |c| eval_node(attrs, c, strict, unknowns)),
        Condition::Any(children) => fold(children, true, |c| eval_node(attrs, c, strict, unknowns)),
        Condition::Not(child) => eval_node(attrs, child, strict, unknowns).map(|b| !b),
    }
}

/// Stop at the first child equal to `decisive`; otherwise unknown if any child was.
fn fold(
    children: &[Condition],
    decisive: bool,
    mut eval: impl FnMut(&Condition) -> Option<bool>,
) -> Option<bool> {
    let mut unknown = false;
    for child in children {
        match eval(child) {
            Some(b) if b == decisive => return Some(decisive),
            Some(_) => {}
            None => unknown = true,
        }
    }
    if unknown { None } else { Some(!decisive) }
}
