use crate::RenderableReport;
use tfguard_types::Severity;

/// Render failed results as GitHub Actions workflow command annotations, at most `max` of them.
///
/// Format:
/// `::{level} file={path},line={line}::{message}`
pub fn render_github_annotations(report: &RenderableReport, max: usize) -> Vec<String> {
    let mut out = Vec::new();

    for r in report.failures().take(max) {
        let level = match r.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "notice",
        };

        let mut meta = String::new();
        if let Some(path) = &r.path {
            meta.push_str(&format!("file={path}"));
            if let Some(line) = r.line {
                meta.push_str(&format!(",line={line}"));
            }
        }

        let message = format!("[{}] {}: {}", r.rule_id, r.resource_address, r.message)
            .replace('%', "%25")
            .replace('\r', "%0D")
            .replace('\n', "%0A");

        if meta.is_empty() {
            out.push(format!("::{level}::{message}"));
        } else {
            out.push(format!("::{level} {meta}::{message}"));
        }
    }

    out
}
