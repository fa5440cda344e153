use crate::condition::evaluate_with;
use crate::fingerprint::fingerprint_for_result;
use crate::model::Resource;
use crate::policy::EvalOptions;
use crate::rule::Rule;
use crate::ruleset::Ruleset;
use rayon::prelude::*;
use tfguard_types::{RuleResult, SeverityCounts, Summary};
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("run cancelled after {evaluated} of {total} resources")]
    Cancelled { evaluated: usize, total: usize },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// What one resource contributed to the run.
#[derive(Default)]
struct ResourceOutcome {
    results: Vec<RuleResult>,
    skipped: u32,
}

/// Evaluate every applicable (resource, rule) pair and summarize.
///
/// Resources are spread over a bounded rayon pool; each resource's rule set is evaluated as a
/// unit, and cancellation is only observed between resources. Results are sorted before the
/// summary is built, so output does not depend on scheduling.
pub fn run(
    resources: &[Resource],
    ruleset: &Ruleset,
    options: &EvalOptions,
) -> Result<Summary, EngineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .build()
        .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

    let outcomes: Vec<Option<ResourceOutcome>> = pool.install(|| {
        resources
            .par_iter()
            .map(|resource| {
                if options.should_stop() {
                    return None;
                }
                Some(evaluate_resource(resource, ruleset, options))
            })
            .collect()
    });

    let evaluated = outcomes.iter().filter(|o| o.is_some()).count();
    if evaluated < resources.len() {
        return Err(EngineError::Cancelled {
            evaluated,
            total: resources.len(),
        });
    }

    let mut results = Vec::new();
    let mut skipped = 0u32;
    for outcome in outcomes.into_iter().flatten() {
        results.extend(outcome.results);
        skipped += outcome.skipped;
    }

    // Deterministic ordering before exposure.
    results.sort_by(compare_results);

    let passed = results.iter().filter(|r| r.passed).count() as u32;
    let total = results.len() as u32;
    debug!(
        resources = resources.len(),
        rules = ruleset.len(),
        total,
        skipped,
        "evaluation finished"
    );

    Ok(Summary {
        total,
        passed,
        failed: total - passed,
        skipped,
        failed_by_severity: SeverityCounts::from_failures(&results),
        min_severity: options.min_severity,
        resources_scanned: resources.len() as u32,
        rules_active: ruleset.len() as u32,
        exit_code: Summary::exit_code_for(&results),
        results,
    })
}

fn evaluate_resource(resource: &Resource, ruleset: &Ruleset, options: &EvalOptions) -> ResourceOutcome {
    let mut outcome = ResourceOutcome::default();
    for rule in ruleset.iter().filter(|r| r.applies_to(&resource.resource_type)) {
        if rule.severity < options.min_severity {
            outcome.skipped += 1;
            continue;
        }
        outcome.results.push(evaluate_pair(resource, rule, options.strict_unknowns));
    }
    outcome
}

fn evaluate_pair(resource: &Resource, rule: &Rule, strict: bool) -> RuleResult {
    let evaluation = evaluate_with(resource, &rule.condition, strict);
    let passed = rule.verdict(&evaluation);
    trace!(rule = %rule.id, resource = %resource.address, passed, "evaluated");

    RuleResult {
        rule_id: rule.id.clone(),
        resource_type: resource.resource_type.clone(),
        resource_address: resource.address.clone(),
        passed,
        severity: rule.severity,
        message: rule.message_for(resource, passed, &evaluation.unknowns),
        location: resource.location.clone(),
        fingerprint: Some(fingerprint_for_result(&rule.id, &resource.address)),
        unknowns: evaluation.unknowns,
    }
}

fn compare_results(a: &RuleResult, b: &RuleResult) -> std::cmp::Ordering {
    // Ordering priority:
    // 1) resource_address
    // 2) rule_id
    // 3) location.path (missing last)
    let path = |r: &RuleResult| {
        r.location
            .as_ref()
            .map(|l| l.path.as_str().to_string())
            .unwrap_or_else(|| "~".to_string())
    };

    a.resource_address
        .cmp(&b.resource_address)
        .then_with(|| a.rule_id.cmp(&b.rule_id))
        .then_with(|| path(a).cmp(&path(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::policy::CancelToken;
    use crate::rule::{Effect, RuleOrigin, SourceKind};
    use crate::ruleset::{RuleSource, Selection, merge_sources};
    use crate::test_support::{pred, resource, rule};
    use serde_json::json;
    use tfguard_types::Severity;

    fn security_group(cidr: &str) -> Resource {
        resource(
            "aws_security_group",
            "bad",
            json!({ "ingress": [{ "from_port": 22, "cidr_blocks": [cidr] }] }),
        )
    }

    fn no_public_ssh() -> Rule {
        rule(
            "no-public-ssh",
            Severity::Error,
            &["aws_security_group"],
            Condition::all(vec![
                pred("ingress[*].from_port", "equals", Some(json!(22))),
                pred("ingress[*].cidr_blocks[*]", "one_of", Some(json!(["0.0.0.0/0"]))),
            ])
            .expect("all"),
        )
        .with_effect(Effect::Deny)
    }

    fn require_encryption() -> Rule {
        rule(
            "require-encryption",
            Severity::Error,
            &["aws_s3_bucket"],
            pred("encryption", "exists", None),
        )
    }

    fn opts() -> EvalOptions {
        EvalOptions::default()
    }

    #[test]
    fn public_ssh_fails_with_exit_one() {
        let set: Ruleset = [no_public_ssh()].into_iter().collect();
        let summary = run(&[security_group("0.0.0.0/0")], &set, &opts()).expect("run");

        assert_eq!(summary.total, 1);
        assert!(!summary.results[0].passed);
        assert_eq!(summary.results[0].severity, Severity::Error);
        assert_eq!(summary.exit_code, 1);
        assert_eq!(summary.failed_by_severity.error, 1);
    }

    #[test]
    fn private_ssh_passes_with_exit_zero() {
        let set: Ruleset = [no_public_ssh()].into_iter().collect();
        let summary = run(&[security_group("10.0.0.0/8")], &set, &opts()).expect("run");

        assert!(summary.results[0].passed);
        assert_eq!(summary.results[0].message, "no-public-ssh");
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn missing_encryption_fails() {
        let set: Ruleset = [require_encryption()].into_iter().collect();
        let bucket = resource("aws_s3_bucket", "insecure", json!({ "bucket": "x" }));
        let summary = run(&[bucket], &set, &opts()).expect("run");

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[0].resource_address, "aws_s3_bucket.insecure");
    }

    #[test]
    fn excluded_rule_produces_no_result() {
        let set: Ruleset = [no_public_ssh(), require_encryption()].into_iter().collect();
        let set = set.select(&Selection::new(Vec::<String>::new(), ["no-public-ssh"]));
        let summary = run(&[security_group("0.0.0.0/0")], &set, &opts()).expect("run");

        assert!(summary.results.iter().all(|r| r.rule_id != "no-public-ssh"));
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn severity_threshold_drops_lower_rules_before_evaluation() {
        let warn = rule(
            "tags-required",
            Severity::Warning,
            &["aws_s3_bucket"],
            pred("tags", "exists", None),
        );
        let set: Ruleset = [require_encryption(), warn].into_iter().collect();
        let bucket = resource("aws_s3_bucket", "insecure", json!({}));

        let summary = run(
            &[bucket],
            &set,
            &opts().with_min_severity(Severity::Error),
        )
        .expect("run");

        assert_eq!(summary.total, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.results[0].rule_id, "require-encryption");
        assert_eq!(summary.min_severity, Severity::Error);
    }

    #[test]
    fn duplicate_ids_are_evaluated_once_with_the_winning_definition() {
        let lower = RuleSource::new(
            RuleOrigin::builtin(),
            vec![rule("R1", Severity::Error, &[], pred("nope", "exists", None))],
        );
        let higher = RuleSource::new(
            RuleOrigin::file(SourceKind::Custom, "custom.toml"),
            vec![rule("R1", Severity::Error, &[], pred("acl", "exists", None))],
        );
        let set = merge_sources(vec![higher, lower]);
        let bucket = resource("aws_s3_bucket", "b", json!({ "acl": "private" }));

        let summary = run(&[bucket], &set, &opts()).expect("run");
        assert_eq!(summary.total, 1);
        assert!(summary.results[0].passed);
    }

    #[test]
    fn type_mismatch_is_neither_result_nor_skip() {
        let set: Ruleset = [require_encryption()].into_iter().collect();
        let summary = run(&[security_group("0.0.0.0/0")], &set, &opts()).expect("run");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.resources_scanned, 1);
        assert_eq!(summary.rules_active, 1);
        assert_eq!(summary.exit_code, 0);
    }

    #[test]
    fn strict_unknowns_fail_even_through_not() {
        let guarded = rule(
            "no-kms-default",
            Severity::Warning,
            &[],
            Condition::not(vec![pred(
                "encryption.kms_key_id",
                "equals",
                Some(json!("alias/aws/s3")),
            )])
            .expect("not"),
        );
        let set: Ruleset = [guarded].into_iter().collect();
        let bucket = resource("aws_s3_bucket", "b", json!({}));

        let lenient = run(std::slice::from_ref(&bucket), &set, &opts()).expect("run");
        assert!(lenient.results[0].passed);

        let strict = run(&[bucket], &set, &opts().strict(true)).expect("run");
        let result = &strict.results[0];
        assert!(!result.passed);
        assert_eq!(result.unknowns.len(), 1);
        assert!(result.message.contains("encryption.kms_key_id"));
    }

    #[test]
    fn strict_any_passes_when_a_resolved_branch_matches() {
        let either = rule(
            "bucket-encrypted",
            Severity::Error,
            &["aws_s3_bucket"],
            Condition::any(vec![
                pred("encryption.algorithm", "equals", Some(json!("AES256"))),
                pred("sse[*].alg", "equals", Some(json!("aws:kms"))),
            ])
            .expect("any"),
        );
        let set: Ruleset = [either].into_iter().collect();
        let kms = resource("aws_s3_bucket", "kms", json!({ "sse": [{ "alg": "aws:kms" }] }));
        let none = resource("aws_s3_bucket", "none", json!({ "sse": [{ "alg": "none" }] }));

        let summary = run(&[kms, none], &set, &opts().strict(true)).expect("run");
        let kms = &summary.results[0];
        assert_eq!(kms.resource_address, "aws_s3_bucket.kms");
        assert!(kms.passed);
        assert_eq!(kms.unknowns.len(), 1);
        assert!(kms.unknowns[0].contains("encryption.algorithm"));

        let none = &summary.results[1];
        assert!(!none.passed);
        assert!(none.message.contains("encryption.algorithm"));
    }

    #[test]
    fn results_are_sorted_and_repeatable() {
        let set: Ruleset = [no_public_ssh(), require_encryption()].into_iter().collect();
        let resources = vec![
            resource("aws_s3_bucket", "z", json!({})),
            security_group("0.0.0.0/0").with_address("aws_security_group.a"),
            resource("aws_s3_bucket", "a", json!({ "encryption": {} })),
        ];
        let options = EvalOptions {
            jobs: 4,
            ..opts()
        };

        let first = run(&resources, &set, &options).expect("run");
        let addresses: Vec<&str> = first
            .results
            .iter()
            .map(|r| r.resource_address.as_str())
            .collect();
        assert_eq!(
            addresses,
            vec!["aws_s3_bucket.a", "aws_s3_bucket.z", "aws_security_group.a"]
        );

        let second = run(&resources, &set, &options).expect("run");
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_run_exposes_no_summary() {
        let set: Ruleset = [require_encryption()].into_iter().collect();
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = EvalOptions {
            cancel,
            ..opts()
        };
        let err = run(
            &[resource("aws_s3_bucket", "a", json!({}))],
            &set,
            &options,
        )
        .expect_err("cancelled");
        assert!(matches!(
            err,
            EngineError::Cancelled {
                evaluated: 0,
                total: 1
            }
        ));
    }

    #[test]
    fn results_carry_location_and_fingerprint() {
        let set: Ruleset = [require_encryption()].into_iter().collect();
        let bucket = resource("aws_s3_bucket", "a", json!({})).with_location(
            tfguard_types::Location {
                path: tfguard_types::RepoPath::new("plan.json"),
                line: Some(7),
            },
        );
        let summary = run(&[bucket], &set, &opts()).expect("run");
        let r = &summary.results[0];
        assert_eq!(r.location.as_ref().and_then(|l| l.line), Some(7));
        assert_eq!(
            r.fingerprint.as_deref(),
            Some(fingerprint_for_result("require-encryption", "aws_s3_bucket.a").as_str())
        );
    }
}
