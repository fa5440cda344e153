//! CLI entry point for tfguard.
//!
//! This module is intentionally thin: it handles argument parsing, logging, I/O, and exit codes.
//! All business logic lives in the `tfguard-app` crate.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use tfguard_app::{
    CheckInput, ExplainOutput, RulesInput, format_explanation, format_not_found,
    format_rule_list, load_ruleset, parse_config, parse_report_json, render_annotations,
    render_markdown, render_text, run_check, run_explain, run_list_rules, serialize_report,
};
use tfguard_domain::{CancelToken, Ruleset};
use tfguard_settings::Overrides;
use tfguard_types::ids;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tfguard",
    version,
    about = "Policy checks for Terraform plans and resource models"
)]
struct Cli {
    /// Repository root; relative inputs and result locations are resolved against it.
    #[arg(long, global = true, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Path to tfguard config TOML (relative to the repo root). A missing file means defaults.
    #[arg(long, global = true, default_value = "tfguard.toml")]
    config: Utf8PathBuf,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
struct RuleArgs {
    /// Only run these rule ids (repeatable). Replaces `include` from the config.
    #[arg(long = "include", value_name = "RULE_ID")]
    include: Vec<String>,

    /// Never run these rule ids (repeatable). Replaces `exclude` from the config.
    #[arg(long = "exclude", value_name = "RULE_ID")]
    exclude: Vec<String>,

    /// Do not load the builtin rule catalog.
    #[arg(long)]
    no_builtin: bool,

    /// Custom rule document (.toml, .json, .yaml); highest precedence.
    #[arg(long = "rules", value_name = "FILE")]
    custom_rules: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate the active rules against resource files.
    Check {
        /// Resource files or directories to scan (default: the repo root).
        paths: Vec<Utf8PathBuf>,

        /// Minimum severity to evaluate (info|warning|error).
        #[arg(long)]
        severity: Option<String>,

        #[command(flatten)]
        rules: RuleArgs,

        /// Treat attribute paths that resolve to nothing as failures.
        #[arg(long)]
        strict_unknowns: bool,

        /// Worker threads (0 = one per core).
        #[arg(long)]
        jobs: Option<usize>,

        /// Abort evaluation after this many milliseconds (0 = no limit).
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output format on stdout.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Also write the JSON report to this file.
        #[arg(long)]
        report_out: Option<Utf8PathBuf>,

        /// Include passed results in text output.
        #[arg(long)]
        show_passed: bool,
    },

    /// List the active rules.
    Rules {
        #[command(flatten)]
        rules: RuleArgs,

        #[arg(long, value_enum, default_value = "text")]
        format: ListFormat,
    },

    /// Show a rule's description and remediation.
    Explain {
        /// The rule id (e.g. "s3-bucket-encryption").
        rule_id: String,

        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Render Markdown from an existing JSON report.
    Md {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/tfguard/report.json")]
        report: Utf8PathBuf,

        /// Where to write the Markdown output (if not specified, prints to stdout).
        #[arg(long, short)]
        output: Option<Utf8PathBuf>,
    },

    /// Render GitHub Actions annotations from an existing JSON report.
    Annotations {
        /// Path to the JSON report file.
        #[arg(long, default_value = "artifacts/tfguard/report.json")]
        report: Utf8PathBuf,

        /// Maximum number of annotations to emit.
        #[arg(long, default_value = "10")]
        max: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("tfguard error: {err:#}");
            ids::EXIT_ERROR
        }
    };
    std::process::exit(code);
}

fn init_logging(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(match verbose {
            0 => "tfguard=warn",
            1 => "tfguard=info",
            _ => "tfguard=debug",
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn dispatch(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.cmd {
        Commands::Check {
            paths,
            severity,
            rules,
            strict_unknowns,
            jobs,
            timeout_ms,
            format,
            report_out,
            show_passed,
        } => {
            let mut overrides = rule_overrides(rules);
            overrides.min_severity = severity.clone();
            overrides.strict_unknowns = strict_unknowns.then_some(true);
            overrides.jobs = *jobs;
            overrides.timeout_ms = *timeout_ms;
            cmd_check(
                cli,
                paths,
                overrides,
                *format,
                report_out.as_deref(),
                *show_passed,
            )
        }
        Commands::Rules { rules, format } => cmd_rules(cli, rules, *format),
        Commands::Explain { rule_id, rules } => cmd_explain(cli, rules, rule_id),
        Commands::Md { report, output } => cmd_md(report, output.as_deref()),
        Commands::Annotations { report, max } => cmd_annotations(report, *max),
    }
}

fn rule_overrides(args: &RuleArgs) -> Overrides {
    Overrides {
        include: (!args.include.is_empty()).then(|| args.include.clone()),
        exclude: (!args.exclude.is_empty()).then(|| args.exclude.clone()),
        no_builtin: args.no_builtin.then_some(true),
        custom_rules: args.custom_rules.clone(),
        ..Overrides::default()
    }
}

fn repo_root(cli: &Cli) -> anyhow::Result<Utf8PathBuf> {
    if !cli.repo_root.exists() {
        anyhow::bail!("repo root does not exist: {}", cli.repo_root);
    }
    cli.repo_root
        .canonicalize_utf8()
        .with_context(|| format!("resolve repo root {}", cli.repo_root))
}

/// Config text, or an empty string when the file does not exist.
fn read_config(repo_root: &Utf8Path, config: &Utf8Path) -> anyhow::Result<String> {
    let path = repo_root.join(config);
    if !path.exists() {
        debug!(config = %path, "no config file; using defaults");
        return Ok(String::new());
    }
    std::fs::read_to_string(&path).with_context(|| format!("read config {path}"))
}

fn cmd_check(
    cli: &Cli,
    paths: &[Utf8PathBuf],
    overrides: Overrides,
    format: OutputFormat,
    report_out: Option<&Utf8Path>,
    show_passed: bool,
) -> anyhow::Result<i32> {
    let root = repo_root(cli)?;
    let config_text = read_config(&root, &cli.config)?;

    let output = run_check(CheckInput {
        repo_root: &root,
        config_text: &config_text,
        config_name: cli.config.as_str(),
        paths: paths.to_vec(),
        overrides,
        cancel: CancelToken::new(),
    })?;

    if let Some(path) = report_out {
        write_file(path, &serialize_report(&output.report)?).context("write report json")?;
    }

    match format {
        OutputFormat::Text => print!("{}", render_text(&output.report, show_passed)),
        OutputFormat::Json => {
            let data = serialize_report(&output.report)?;
            print!("{}", String::from_utf8_lossy(&data));
        }
        OutputFormat::Markdown => print!("{}", render_markdown(&output.report)),
    }

    Ok(output.exit_code())
}

fn active_ruleset(cli: &Cli, args: &RuleArgs) -> anyhow::Result<Ruleset> {
    let root = repo_root(cli)?;
    let config_text = read_config(&root, &cli.config)?;
    let cfg = parse_config(&config_text)?;
    let resolved =
        tfguard_settings::resolve_config(&cfg, rule_overrides(args)).context("resolve config")?;
    let inputs = tfguard_repo::discover_inputs(&root, &[], &resolved.resource_globs)
        .context("discover inputs")?;
    load_ruleset(&RulesInput {
        inputs: &inputs,
        config: &cfg,
        config_name: cli.config.as_str(),
        resolved: &resolved,
    })
}

fn cmd_rules(cli: &Cli, args: &RuleArgs, format: ListFormat) -> anyhow::Result<i32> {
    let ruleset = active_ruleset(cli, args)?;
    let rules = run_list_rules(&ruleset);
    match format {
        ListFormat::Text => print!("{}", format_rule_list(&rules)),
        ListFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&rules).context("serialize rule list")?
            );
        }
    }
    Ok(ids::EXIT_PASS)
}

fn cmd_explain(cli: &Cli, args: &RuleArgs, rule_id: &str) -> anyhow::Result<i32> {
    let ruleset = active_ruleset(cli, args)?;
    match run_explain(&ruleset, rule_id) {
        ExplainOutput::Found(rule) => {
            print!("{}", format_explanation(&rule));
            Ok(ids::EXIT_PASS)
        }
        ExplainOutput::NotFound {
            identifier,
            available,
        } => {
            eprint!("{}", format_not_found(&identifier, &available));
            Ok(ids::EXIT_ERROR)
        }
    }
}

fn cmd_md(report_path: &Utf8Path, output: Option<&Utf8Path>) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(report_path)
        .with_context(|| format!("read report: {report_path}"))?;
    let report = parse_report_json(&report_text)?;
    let md = render_markdown(&report);

    if let Some(out_path) = output {
        write_file(out_path, md.as_bytes()).context("write markdown output")?;
    } else {
        print!("{md}");
    }

    Ok(ids::EXIT_PASS)
}

fn cmd_annotations(report_path: &Utf8Path, max: usize) -> anyhow::Result<i32> {
    let report_text = std::fs::read_to_string(report_path)
        .with_context(|| format!("read report: {report_path}"))?;
    let report = parse_report_json(&report_text)?;

    for annotation in render_annotations(&report, max) {
        println!("{annotation}");
    }

    Ok(ids::EXIT_PASS)
}

fn write_file(path: &Utf8Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {parent}"))?;
    }
    std::fs::write(path, data).with_context(|| format!("write {path}"))?;
    Ok(())
}
