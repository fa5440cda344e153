//! Developer tasks (schema generation, fixture conformance, catalog lint).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use schemars::schema_for;
use std::fs;
use std::path::PathBuf;
use tfguard_types::ids;

/// Get the project root (parent of xtask directory).
fn project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Get the schemas directory path.
fn schemas_dir() -> PathBuf {
    project_root().join("schemas")
}

fn fixtures_dir() -> PathBuf {
    project_root().join("tests").join("fixtures")
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_report_schema() -> schemars::Schema {
    schema_for!(tfguard_types::ReportEnvelope)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(tfguard_settings::TfguardConfigV1)
}

fn generate_rules_schema() -> schemars::Schema {
    schema_for!(tfguard_settings::RuleDocumentV1)
}

/// List of schemas to generate.
fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: "tfguard.report.v1.json",
            generate: generate_report_schema,
        },
        SchemaSpec {
            filename: "tfguard.config.v1.json",
            generate: generate_config_schema,
        },
        SchemaSpec {
            filename: "tfguard.rules.v1.json",
            generate: generate_rules_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir();
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename);
        if !path.exists() {
            missing.push(spec.filename);
            continue;
        }

        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(spec.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    for name in &missing {
        eprintln!("Missing schema: {name}");
    }
    for name in &mismatched {
        eprintln!("Schema out of date: {name}");
    }
    eprintln!("\nRun `cargo run -p xtask -- emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

/// Check that a path is clean: no absolute paths, no `../`, forward slashes only.
fn is_clean_path(path: &str) -> bool {
    !(path.starts_with('/')
        || path.starts_with('\\')
        || path.contains("..")
        || path.contains('\\')
        || (path.len() >= 2 && path.as_bytes()[1] == b':'))
}

/// Golden reports must validate against the report schema, use clean paths, and already be
/// normalized (no real timestamps or versions).
fn conform() -> anyhow::Result<()> {
    let schema = serde_json::to_value(generate_report_schema()).context("schema to json")?;
    let compiled = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile schema: {e}"))?;

    let mut errors = Vec::new();
    let mut count = 0;

    let mut dirs: Vec<PathBuf> = fs::read_dir(fixtures_dir())
        .context("Failed to read tests/fixtures/")?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.join("expected.report.json").exists())
        .collect();
    dirs.sort();

    for dir in dirs {
        let name = dir
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content = fs::read_to_string(dir.join("expected.report.json"))
            .with_context(|| format!("Failed to read {name}/expected.report.json"))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {name}/expected.report.json"))?;

        for err in compiled.iter_errors(&value) {
            errors.push(format!("{name}: schema validation: {err}"));
        }

        if value.get("schema").and_then(|v| v.as_str()) != Some(ids::SCHEMA_REPORT_V1) {
            errors.push(format!("{name}: schema is not {}", ids::SCHEMA_REPORT_V1));
        }

        if tfguard_test_util::normalize_nondeterministic(value.clone()) != value {
            errors.push(format!("{name}: timestamps or version are not normalized"));
        }

        let results = value
            .pointer("/summary/results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        for (i, result) in results.iter().enumerate() {
            if let Some(path) = result.pointer("/location/path").and_then(|v| v.as_str())
                && !is_clean_path(path)
            {
                errors.push(format!("{name}: results[{i}].location.path '{path}' is not clean"));
            }
        }

        count += 1;
        println!("  ok {name}");
    }

    if count == 0 {
        bail!("No golden reports found in {}", fixtures_dir().display());
    }
    if !errors.is_empty() {
        eprintln!("\nConformance errors:");
        for err in &errors {
            eprintln!("  - {err}");
        }
        bail!("Conformance validation failed with {} errors", errors.len());
    }

    println!("\nAll {count} golden reports conform.");
    Ok(())
}

/// Every builtin rule must be documented well enough for `tfguard explain`.
fn lint_catalog() -> anyhow::Result<()> {
    let source = tfguard_catalog::builtin_source().context("builtin catalog does not load")?;
    let mut errors = Vec::new();

    for rule in &source.rules {
        let id = &rule.id;
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(format!("{id}: ids are lowercase kebab-case"));
        }
        if rule.name == rule.id {
            errors.push(format!("{id}: missing name"));
        }
        if rule.description.is_empty() {
            errors.push(format!("{id}: missing description"));
        }
        if rule.remediation.is_empty() {
            errors.push(format!("{id}: missing remediation"));
        }
        if rule.message.is_empty() {
            errors.push(format!("{id}: missing message template"));
        }
        if rule.resource_types.is_empty() {
            errors.push(format!("{id}: applies to every resource type"));
        }
    }

    for family in tfguard_catalog::families() {
        println!("  {} ({} bytes)", family.name, family.document.len());
    }

    if !errors.is_empty() {
        eprintln!("\nCatalog lint errors:");
        for err in &errors {
            eprintln!("  - {err}");
        }
        bail!("Catalog lint failed with {} errors", errors.len());
    }

    println!("\n{} builtin rules pass lint.", source.rules.len());
    Ok(())
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Validate golden reports under tests/fixtures/");
    eprintln!("  lint-catalog      Check that every builtin rule is fully documented");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "lint-catalog" => lint_catalog(),
        "print-schema-ids" => {
            for id in [ids::SCHEMA_REPORT_V1, ids::SCHEMA_CONFIG_V1, ids::SCHEMA_RULES_V1] {
                println!("{id}");
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo run -p xtask -- help` for usage."),
    }
    .context("xtask failed")
}
