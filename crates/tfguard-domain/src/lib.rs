//! Pure rule evaluation (no IO).
//!
//! Input: resources extracted elsewhere and a validated, merged ruleset.
//! Output: ordered results + counts + exit code.

#![forbid(unsafe_code)]

pub mod condition;
pub mod error;
pub mod model;
pub mod path;
pub mod policy;
pub mod rule;
pub mod ruleset;
pub mod template;

mod engine;
mod fingerprint;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod properties;

pub use condition::{Condition, Evaluation, Operator, Predicate, evaluate, evaluate_with};
pub use engine::{EngineError, run};
pub use error::RuleError;
pub use model::Resource;
pub use path::{AttrPath, PathError, resolve};
pub use policy::{CancelToken, EvalOptions};
pub use rule::{Effect, Rule, RuleOrigin, SourceKind};
pub use ruleset::{RuleSource, Ruleset, Selection, merge_sources};
pub use template::MessageTemplate;
