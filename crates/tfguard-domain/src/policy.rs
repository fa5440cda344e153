use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tfguard_types::Severity;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run evaluation options.
#[derive(Clone, Debug)]
pub struct EvalOptions {
    pub min_severity: Severity,
    pub strict_unknowns: bool,
    /// Worker threads; `0` lets rayon choose.
    pub jobs: usize,
    pub deadline: Option<Instant>,
    pub cancel: CancelToken,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            strict_unknowns: false,
            jobs: 0,
            deadline: None,
            cancel: CancelToken::new(),
        }
    }
}

impl EvalOptions {
    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    pub fn strict(mut self, strict_unknowns: bool) -> Self {
        self.strict_unknowns = strict_unknowns;
        self
    }

    /// True once the token fired or the deadline passed.
    pub fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
