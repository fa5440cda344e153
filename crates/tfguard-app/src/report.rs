//! Report (de)serialization and render entry points over saved reports.

use anyhow::Context;
use tfguard_render::RenderableReport;
use tfguard_types::{ReportEnvelope, ids};

/// Parse a saved JSON report. Only `tfguard.report.v1` is accepted.
pub fn parse_report_json(text: &str) -> anyhow::Result<ReportEnvelope> {
    let value: serde_json::Value = serde_json::from_str(text).context("parse report json")?;

    let schema = value
        .get("schema")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if schema != ids::SCHEMA_REPORT_V1 {
        anyhow::bail!(
            "unknown report schema: {schema:?} (expected {})",
            ids::SCHEMA_REPORT_V1
        );
    }
    serde_json::from_value(value).context("parse tfguard v1 report")
}

pub fn serialize_report(report: &ReportEnvelope) -> anyhow::Result<Vec<u8>> {
    let mut data = serde_json::to_vec_pretty(report).context("serialize report")?;
    data.push(b'\n');
    Ok(data)
}

pub fn to_renderable(report: &ReportEnvelope) -> RenderableReport {
    RenderableReport::from_summary(&report.summary)
}

pub fn render_text(report: &ReportEnvelope, show_passed: bool) -> String {
    tfguard_render::render_text(&to_renderable(report), show_passed)
}

pub fn render_markdown(report: &ReportEnvelope) -> String {
    tfguard_render::render_markdown(&to_renderable(report))
}

pub fn render_annotations(report: &ReportEnvelope, max: usize) -> Vec<String> {
    tfguard_render::render_github_annotations(&to_renderable(report), max)
}
