use crate::RenderableReport;
use tfguard_types::Severity;

const ORDER: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

/// Human-readable terminal report.
///
/// Results are grouped by severity, most severe first. Passed results are listed only when
/// `show_passed` is set; the totals line is always printed.
pub fn render_text(report: &RenderableReport, show_passed: bool) -> String {
    let mut out = String::new();
    let t = &report.totals;

    out.push_str(&format!(
        "tfguard: {} resource(s), {} rule(s), threshold {}\n",
        t.resources, t.rules, report.min_severity
    ));

    let mut listed = false;
    for severity in ORDER {
        let group: Vec<_> = report.by_severity(severity, show_passed).collect();
        if group.is_empty() {
            continue;
        }
        listed = true;
        out.push_str(&format!("\n{} ({})\n", severity.as_str().to_uppercase(), group.len()));
        for r in group {
            let marker = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!("  {marker} {} {}", r.rule_id, r.resource_address));
            if let Some(loc) = r.location() {
                out.push_str(&format!(" ({loc})"));
            }
            out.push('\n');
            out.push_str(&format!("       {}\n", r.message));
        }
    }

    if !listed {
        out.push_str("\nNo failing results.\n");
    }

    out.push_str(&format!(
        "\n{} evaluated: {} passed, {} failed, {} skipped\n",
        t.total, t.passed, t.failed, t.skipped
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{clean_report, sample_report};

    #[test]
    fn failures_only_by_default() {
        let text = render_text(&sample_report(), false);
        insta::assert_snapshot!(text, @r"
        tfguard: 2 resource(s), 3 rule(s), threshold info

        ERROR (1)
          FAIL s3-bucket-encryption aws_s3_bucket.insecure (plans/prod.tfplan.json:12)
               S3 bucket aws_s3_bucket.insecure has no server-side encryption

        WARNING (1)
          FAIL s3-bucket-versioning aws_s3_bucket.insecure (plans/prod.tfplan.json:12)
               S3 bucket insecure does not enable versioning

        3 evaluated: 1 passed, 2 failed, 0 skipped
        ");
    }

    #[test]
    fn show_passed_lists_every_result() {
        let text = render_text(&sample_report(), true);
        assert!(text.contains("INFO (1)\n  PASS sg-description aws_security_group.web\n"));
        let error_at = text.find("ERROR").expect("error group");
        let info_at = text.find("INFO").expect("info group");
        assert!(error_at < info_at);
    }

    #[test]
    fn clean_runs_say_so() {
        let text = render_text(&clean_report(), false);
        assert!(text.contains("threshold warning"));
        assert!(text.contains("No failing results."));
        assert!(text.ends_with("1 evaluated: 1 passed, 0 failed, 4 skipped\n"));
    }
}
