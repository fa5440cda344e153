use tfguard_types::{RuleResult, Severity, Summary};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableResult {
    pub rule_id: String,
    pub resource_address: String,
    pub passed: bool,
    pub severity: Severity,
    pub message: String,
    pub path: Option<String>,
    pub line: Option<u32>,
}

impl From<&RuleResult> for RenderableResult {
    fn from(r: &RuleResult) -> Self {
        Self {
            rule_id: r.rule_id.clone(),
            resource_address: r.resource_address.clone(),
            passed: r.passed,
            severity: r.severity,
            message: r.message.clone(),
            path: r.location.as_ref().map(|l| l.path.as_str().to_string()),
            line: r.location.as_ref().and_then(|l| l.line),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderableTotals {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub resources: u32,
    pub rules: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderableReport {
    pub min_severity: Severity,
    pub totals: RenderableTotals,
    pub results: Vec<RenderableResult>,
}

impl RenderableReport {
    pub fn from_summary(summary: &Summary) -> Self {
        Self {
            min_severity: summary.min_severity,
            totals: RenderableTotals {
                total: summary.total,
                passed: summary.passed,
                failed: summary.failed,
                skipped: summary.skipped,
                resources: summary.resources_scanned,
                rules: summary.rules_active,
            },
            results: summary.results.iter().map(RenderableResult::from).collect(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RenderableResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Results of one severity, keeping the summary's order.
    pub(crate) fn by_severity(
        &self,
        severity: Severity,
        show_passed: bool,
    ) -> impl Iterator<Item = &RenderableResult> {
        self.results
            .iter()
            .filter(move |r| r.severity == severity && (show_passed || !r.passed))
    }
}

impl RenderableResult {
    /// `path:line`, `path`, or nothing.
    pub(crate) fn location(&self) -> Option<String> {
        let path = self.path.as_deref()?;
        Some(match self.line {
            Some(line) => format!("{path}:{line}"),
            None => path.to_string(),
        })
    }
}
