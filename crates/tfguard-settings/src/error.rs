use tfguard_domain::RuleError;

/// A rule source that cannot be loaded. Always names the file; aborts the run before evaluation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{file}: unsupported rule document extension (expected .toml, .json, .yaml or .yml)")]
    UnsupportedFormat { file: String },

    #[error("{file}: invalid {format}: {message}")]
    Syntax {
        file: String,
        format: &'static str,
        message: String,
    },

    #[error("{file}: unsupported rule document schema '{found}' (expected {expected})")]
    Schema {
        file: String,
        found: String,
        expected: &'static str,
    },

    #[error("{file}: rule '{rule_id}': {error}")]
    InvalidRule {
        file: String,
        rule_id: String,
        error: RuleError,
    },

    #[error("{file}: rule id '{rule_id}' is defined more than once")]
    DuplicateId { file: String, rule_id: String },
}

impl LoadError {
    pub fn file(&self) -> &str {
        match self {
            LoadError::UnsupportedFormat { file }
            | LoadError::Syntax { file, .. }
            | LoadError::Schema { file, .. }
            | LoadError::InvalidRule { file, .. }
            | LoadError::DuplicateId { file, .. } => file,
        }
    }
}
