//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Result ordering determinism
//! - Severity threshold monotonicity and exclude dominance
//! - Wildcard and absence semantics of the evaluator
//! - Path parsing on arbitrary input

use crate::condition::{Condition, evaluate};
use crate::engine::run;
use crate::model::Resource;
use crate::path::{AttrPath, resolve};
use crate::policy::EvalOptions;
use crate::rule::Rule;
use crate::ruleset::{Ruleset, Selection};
use proptest::prelude::*;
use serde_json::{Value, json};
use tfguard_types::Severity;

// ============================================================================
// Strategies
// ============================================================================

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Warning),
        Just(Severity::Error),
    ]
}

fn arb_cidr() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0.0.0.0/0".to_string()),
        Just("10.0.0.0/8".to_string()),
        Just("192.168.0.0/16".to_string()),
        Just("172.16.0.0/12".to_string()),
    ]
}

fn arb_ingress() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just(22u16), Just(80), Just(443), Just(3389)],
        prop::collection::vec(arb_cidr(), 0..4),
    )
        .prop_map(|(port, cidrs)| json!({ "from_port": port, "cidr_blocks": cidrs }))
}

fn arb_security_group() -> impl Strategy<Value = Resource> {
    (
        "[a-z][a-z0-9_]{0,8}",
        prop::collection::vec(arb_ingress(), 0..5),
        prop::bool::ANY,
    )
        .prop_map(|(name, ingress, tagged)| {
            let mut attrs = json!({ "name": name.clone(), "ingress": ingress });
            if tagged {
                attrs["tags"] = json!({ "env": "prod" });
            }
            Resource::new("aws_security_group", name, attrs)
        })
}

/// Resources with unique addresses.
fn arb_resources() -> impl Strategy<Value = Vec<Resource>> {
    prop::collection::vec(arb_security_group(), 0..8).prop_map(|rs| {
        rs.into_iter()
            .enumerate()
            .map(|(i, r)| {
                let address = format!("{}_{i}", r.address);
                r.with_address(address)
            })
            .collect()
    })
}

fn candidate_conditions() -> Vec<Condition> {
    let p = |path: &str, op: &str, v: Option<Value>| {
        Condition::predicate(path, op, v).expect("valid predicate")
    };
    vec![
        p("tags", "exists", None),
        p("ingress[*].from_port", "equals", Some(json!(22))),
        p("ingress[*].cidr_blocks[*]", "one_of", Some(json!(["0.0.0.0/0"]))),
        p("ingress[0].from_port", "less_than", Some(json!(100))),
        p("name", "matches", Some(json!("^[a-m]"))),
    ]
}

fn arb_ruleset() -> impl Strategy<Value = Ruleset> {
    prop::collection::vec((arb_severity(), 0usize..5), 1..6).prop_map(|specs| {
        let conditions = candidate_conditions();
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (severity, c))| {
                Rule::new(&format!("rule-{i}"), conditions[c].clone())
                    .expect("valid rule")
                    .with_severity(severity)
            })
            .collect()
    })
}

// ============================================================================
// Engine properties
// ============================================================================

proptest! {
    #[test]
    fn runs_are_deterministic(resources in arb_resources(), rules in arb_ruleset()) {
        let a = run(&resources, &rules, &EvalOptions::default()).expect("run");
        let mut reversed = resources.clone();
        reversed.reverse();
        let b = run(&reversed, &rules, &EvalOptions { jobs: 3, ..EvalOptions::default() })
            .expect("run");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn raising_the_threshold_never_adds_failures(
        resources in arb_resources(),
        rules in arb_ruleset(),
        low in arb_severity(),
        high in arb_severity(),
    ) {
        prop_assume!(low <= high);
        let lo = run(&resources, &rules, &EvalOptions::default().with_min_severity(low))
            .expect("run");
        let hi = run(&resources, &rules, &EvalOptions::default().with_min_severity(high))
            .expect("run");

        prop_assert!(hi.failed <= lo.failed);
        for r in hi.failures() {
            prop_assert!(lo.results.contains(r));
        }
    }

    #[test]
    fn excluded_rules_never_report(
        resources in arb_resources(),
        rules in arb_ruleset(),
        pick in 0usize..6,
    ) {
        let excluded = format!("rule-{pick}");
        let include: Vec<String> = rules.ids().map(str::to_string).collect();
        let selected = rules.select(&Selection::new(include, [excluded.clone()]));
        let summary = run(&resources, &selected, &EvalOptions::default()).expect("run");
        prop_assert!(summary.results.iter().all(|r| r.rule_id != excluded));
    }
}

// ============================================================================
// Evaluator properties
// ============================================================================

proptest! {
    #[test]
    fn wildcard_predicate_matches_iff_some_element_does(sg in arb_security_group()) {
        let wildcard = Condition::predicate("ingress[*].from_port", "equals", Some(json!(22)))
            .expect("valid");
        let expected = sg.attributes["ingress"]
            .as_array()
            .is_some_and(|items| items.iter().any(|i| i["from_port"] == json!(22)));
        prop_assert_eq!(evaluate(&sg, &wildcard), expected);
    }

    #[test]
    fn absent_paths_only_satisfy_not_exists(
        field in "[a-z]{3,10}",
        op in prop::sample::select(vec![
            "equals", "not_equals", "contains", "not_contains", "greater_than", "less_than",
        ]),
    ) {
        let path = format!("missing_{field}.inner[*]");
        let r = Resource::new("aws_s3_bucket", "b", json!({ "acl": "private" }));
        let operand = json!(1);

        let cond = Condition::predicate(&path, op, Some(operand)).expect("valid");
        prop_assert!(!evaluate(&r, &cond));
        prop_assert!(!evaluate(&r, &Condition::predicate(&path, "exists", None).expect("valid")));
        prop_assert!(evaluate(&r, &Condition::predicate(&path, "not_exists", None).expect("valid")));
    }

    #[test]
    fn path_parser_never_panics(input in ".{0,40}") {
        if let Ok(path) = AttrPath::parse(&input) {
            let _ = resolve(&json!({ "a": [1, { "b": null }] }), &path);
        }
    }
}
