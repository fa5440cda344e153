use crate::RenderableReport;
use tfguard_types::Severity;

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();
    let t = &report.totals;

    out.push_str("# tfguard report\n\n");
    let verdict = if t.failed == 0 { "PASS" } else { "FAIL" };
    out.push_str(&format!(
        "- Verdict: **{}**\n- Results: {} passed / {} failed / {} skipped ({} evaluated)\n- Threshold: `{}`\n\n",
        verdict, t.passed, t.failed, t.skipped, t.total, report.min_severity
    ));

    let failures: Vec<_> = report.failures().collect();
    if failures.is_empty() {
        out.push_str("No failing results.\n");
        return out;
    }

    out.push_str("## Failures\n\n");
    out.push_str("| Severity | Rule | Resource | Location | Message |\n");
    out.push_str("|---|---|---|---|---|\n");
    for r in failures {
        let sev = match r.severity {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        };
        let location = r
            .location()
            .map(|l| format!("`{l}`"))
            .unwrap_or_default();
        out.push_str(&format!(
            "| {} | `{}` | `{}` | {} | {} |\n",
            sev,
            r.rule_id,
            r.resource_address,
            location,
            escape_cell(&r.message)
        ));
    }

    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
