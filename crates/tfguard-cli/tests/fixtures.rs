//! End-to-end CLI integration tests using test fixtures.
//!
//! Each fixture in `tests/fixtures/` contains:
//! - resource files (plan JSON or the native resource model) and optional adjacent rule documents
//! - a `tfguard.toml`
//! - an `expected.report.json` (timestamps and version use placeholders)
//!
//! These tests run the CLI against each fixture and verify:
//! 1. Exit code matches expected (0 = pass, 1 = violations)
//! 2. JSON output matches expected (ignoring timestamps and version)

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tfguard_test_util::normalize_nondeterministic;

/// Helper to get a Command for the tfguard binary.
/// Wraps the deprecated cargo_bin to centralize the deprecation warning.
#[allow(deprecated)]
fn tfguard_cmd() -> Command {
    Command::cargo_bin("tfguard").expect("tfguard binary not found - run `cargo build` first")
}

/// Get the path to the test fixtures directory
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("tfguard-cli crate should have a parent directory")
        .parent()
        .expect("crates directory should have a parent (repo root)")
        .join("tests")
        .join("fixtures")
}

/// Run `tfguard check` against a fixture and return the exit code and JSON report.
fn run_check_on_fixture(fixture_name: &str, extra: &[&str]) -> (i32, Value) {
    let fixture_path = fixtures_dir().join(fixture_name);
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let report_path = temp_dir.path().join("report.json");

    let output = tfguard_cmd()
        .arg("--repo-root")
        .arg(&fixture_path)
        .arg("check")
        .arg("--format")
        .arg("json")
        .arg("--report-out")
        .arg(&report_path)
        .args(extra)
        .output()
        .expect("Failed to run command");

    let exit_code = output.status.code().unwrap_or(-1);

    let report_content = std::fs::read_to_string(&report_path).expect("Failed to read report");
    let report: Value = serde_json::from_str(&report_content).expect("Failed to parse report JSON");

    let stdout: Value = serde_json::from_slice(&output.stdout).expect("stdout is the JSON report");
    assert_eq!(
        normalize_nondeterministic(stdout),
        normalize_nondeterministic(report.clone()),
        "stdout and --report-out should carry the same report"
    );

    (exit_code, report)
}

/// Load and parse the expected report for a fixture.
fn load_expected_report(fixture_name: &str) -> Value {
    let expected_path = fixtures_dir()
        .join(fixture_name)
        .join("expected.report.json");
    let content = std::fs::read_to_string(&expected_path).expect("Failed to read expected report");
    serde_json::from_str(&content).expect("Failed to parse expected report")
}

/// Compare two JSON values, ignoring timestamp and version differences.
fn assert_reports_match(actual: Value, expected: Value, fixture_name: &str) {
    let actual_normalized = normalize_nondeterministic(actual);
    let expected_normalized = normalize_nondeterministic(expected);

    assert_eq!(
        actual_normalized,
        expected_normalized,
        "Report mismatch for fixture '{}'.\n\nActual:\n{}\n\nExpected:\n{}",
        fixture_name,
        serde_json::to_string_pretty(&actual_normalized).expect("serialize"),
        serde_json::to_string_pretty(&expected_normalized).expect("serialize")
    );
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write file");
}

// ============================================================================
// Fixture tests
// ============================================================================

#[test]
fn fixture_clean_passes() {
    let (exit_code, report) = run_check_on_fixture("clean", &[]);
    assert_eq!(exit_code, 0, "clean fixture should exit with 0 (pass)");
    assert_reports_match(report, load_expected_report("clean"), "clean");
}

#[test]
fn fixture_violations_fail() {
    let (exit_code, report) = run_check_on_fixture("violations", &[]);
    assert_eq!(exit_code, 1, "violations fixture should exit with 1");
    assert_reports_match(report, load_expected_report("violations"), "violations");
}

#[test]
fn fixture_strict_unknowns_fail() {
    let (exit_code, report) = run_check_on_fixture("strict_unknowns", &[]);
    assert_eq!(exit_code, 1);
    assert_reports_match(
        report,
        load_expected_report("strict_unknowns"),
        "strict_unknowns",
    );
}

#[test]
fn fixture_spec_file_overrides_config_rule() {
    let (exit_code, report) = run_check_on_fixture("spec_precedence", &[]);
    assert_eq!(exit_code, 1);
    assert_reports_match(
        report,
        load_expected_report("spec_precedence"),
        "spec_precedence",
    );
}

#[test]
fn severity_flag_drops_warning_failures() {
    let (exit_code, report) = run_check_on_fixture("violations", &["--severity", "error"]);
    assert_eq!(exit_code, 1);
    let summary = &report["summary"];
    assert_eq!(summary["min_severity"], "error");
    assert_eq!(summary["failed"], 2);
    assert_eq!(summary["failed_by_severity"]["warning"], 0);
    assert_eq!(summary["skipped"], 3);
}

#[test]
fn excluding_every_failing_rule_passes() {
    let (exit_code, report) = run_check_on_fixture(
        "violations",
        &[
            "--exclude",
            "no-public-ssh",
            "--exclude",
            "bucket-encryption",
            "--exclude",
            "bucket-versioning",
        ],
    );
    assert_eq!(exit_code, 0);
    assert_eq!(report["summary"]["total"], 0);
    assert_eq!(report["summary"]["rules_active"], 1);
}

#[test]
fn text_output_groups_failures() {
    tfguard_cmd()
        .arg("--repo-root")
        .arg(fixtures_dir().join("violations"))
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("ERROR (2)"))
        .stdout(predicate::str::contains(
            "FAIL no-public-ssh module.net.aws_security_group.web (envs/prod/plan.json:69)",
        ))
        .stdout(predicate::str::contains("5 evaluated: 2 passed, 3 failed, 1 skipped"))
        .stdout(predicate::str::contains("PASS").not());
}

#[test]
fn markdown_output_is_a_failure_table() {
    tfguard_cmd()
        .arg("--repo-root")
        .arg(fixtures_dir().join("violations"))
        .args(["check", "--format", "markdown"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("# tfguard report"))
        .stdout(predicate::str::contains("| ERROR | `bucket-encryption` |"));
}

#[test]
fn md_and_annotations_render_saved_reports() {
    let temp_dir = TempDir::new().expect("temp dir");
    let report_path = temp_dir.path().join("out/report.json");
    tfguard_cmd()
        .arg("--repo-root")
        .arg(fixtures_dir().join("violations"))
        .args(["check", "--report-out"])
        .arg(&report_path)
        .assert()
        .code(1);

    tfguard_cmd()
        .arg("md")
        .arg("--report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Verdict: **FAIL**"));

    let output = tfguard_cmd()
        .arg("annotations")
        .arg("--report")
        .arg(&report_path)
        .args(["--max", "2"])
        .output()
        .expect("run annotations");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "::error file=envs/prod/plan.json,line=37::[bucket-encryption] aws_s3_bucket.logs: Bucket acme-logs is not encrypted"
    );
}

#[test]
fn invalid_rule_documents_exit_two() {
    let temp_dir = TempDir::new().expect("temp dir");
    let root = temp_dir.path();
    write_file(
        &root.join("plans/plan.json"),
        r#"{"format_version":"1.2","planned_values":{"root_module":{}}}"#,
    );
    write_file(
        &root.join("plans/broken.tfguard.toml"),
        "[[rules]]\nid = \"broken\"\ncondition = { path = \"a\", op = \"bogus\" }\n",
    );

    tfguard_cmd()
        .arg("--repo-root")
        .arg(root)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("plans/broken.tfguard.toml"))
        .stderr(predicate::str::contains("broken"))
        .stderr(predicate::str::contains("unknown operator 'bogus'"));
}

#[test]
fn duplicate_ids_in_one_source_exit_two() {
    let temp_dir = TempDir::new().expect("temp dir");
    let root = temp_dir.path();
    write_file(
        &root.join("tfguard.toml"),
        "[[rules]]\nid = \"r1\"\ncondition = { path = \"a\" }\n\n[[rules]]\nid = \"r1\"\ncondition = { path = \"b\" }\n",
    );

    tfguard_cmd()
        .arg("--repo-root")
        .arg(root)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("'r1' is defined more than once"));
}

#[test]
fn malformed_resource_files_exit_two() {
    let temp_dir = TempDir::new().expect("temp dir");
    let root = temp_dir.path();
    write_file(&root.join("plan.json"), "{ not json");

    tfguard_cmd()
        .arg("--repo-root")
        .arg(root)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tfguard error"));
}

#[test]
fn missing_repo_root_exits_two() {
    tfguard_cmd()
        .args(["--repo-root", "/definitely/not/here", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("repo root does not exist"));
}

#[test]
fn rules_lists_the_active_catalog() {
    tfguard_cmd()
        .arg("--repo-root")
        .arg(fixtures_dir().join("violations"))
        .args(["rules", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\": \"bucket-encryption\""))
        .stdout(predicate::str::contains("\"origin\": \"config:tfguard.toml\""));

    let temp_dir = TempDir::new().expect("temp dir");
    tfguard_cmd()
        .arg("--repo-root")
        .arg(temp_dir.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("s3-bucket-encryption"))
        .stdout(predicate::str::contains("[builtin]"));
}

#[test]
fn explain_known_and_unknown_rules() {
    let temp_dir = TempDir::new().expect("temp dir");
    tfguard_cmd()
        .arg("--repo-root")
        .arg(temp_dir.path())
        .args(["explain", "sg-no-public-ssh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remediation"));

    tfguard_cmd()
        .arg("--repo-root")
        .arg(temp_dir.path())
        .args(["explain", "not-a-rule"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown rule id: not-a-rule"));
}
