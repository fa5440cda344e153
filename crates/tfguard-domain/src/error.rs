use crate::path::PathError;

/// Validation failures for a single rule. Raised while loading, never during evaluation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule id must not be empty")]
    EmptyId,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("unknown operator '{0}' (expected one of: {ops})", ops = crate::condition::Operator::names())]
    UnknownOperator(String),

    #[error("operator '{operator}' requires an operand")]
    MissingOperand { operator: &'static str },

    #[error("operator '{operator}' takes no operand")]
    UnexpectedOperand { operator: &'static str },

    #[error("operator '{operator}' requires {expected} operand, got {found}")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("'{kind}' requires at least one child condition")]
    EmptyCombinator { kind: &'static str },

    #[error("'not' requires exactly one child condition, got {0}")]
    NotArity(usize),

    #[error("condition must set exactly one of all, any, not or path ({0})")]
    ConditionShape(String),

    #[error("unknown severity '{0}' (expected info|warning|error)")]
    UnknownSeverity(String),

    #[error("unknown effect '{0}' (expected require|deny)")]
    UnknownEffect(String),

    #[error("message template: {0}")]
    Template(String),
}
