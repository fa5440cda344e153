//! Built-in rule catalog.
//!
//! Rules are grouped into families, each an embedded rule document gated by a cargo feature so
//! downstream builds can drop families they never want.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use tfguard_domain::{RuleOrigin, RuleSource};
use tfguard_settings::{DocFormat, LoadError, parse_rules};

/// One embedded rule document.
#[derive(Clone, Copy, Debug)]
pub struct Family {
    pub name: &'static str,
    pub document: &'static str,
}

/// Families compiled into this build, in a fixed order.
#[allow(unused_mut)]
pub fn families() -> Vec<Family> {
    let mut out = Vec::new();
    #[cfg(feature = "aws-s3")]
    out.push(Family {
        name: "aws-s3",
        document: include_str!("rules/s3.toml"),
    });
    #[cfg(feature = "aws-network")]
    out.push(Family {
        name: "aws-network",
        document: include_str!("rules/network.toml"),
    });
    #[cfg(feature = "aws-storage")]
    out.push(Family {
        name: "aws-storage",
        document: include_str!("rules/storage.toml"),
    });
    #[cfg(feature = "aws-logging")]
    out.push(Family {
        name: "aws-logging",
        document: include_str!("rules/logging.toml"),
    });
    #[cfg(feature = "aws-iam")]
    out.push(Family {
        name: "aws-iam",
        document: include_str!("rules/iam.toml"),
    });
    out
}

/// Parse every enabled family into a single builtin rule source.
pub fn builtin_source() -> Result<RuleSource, LoadError> {
    let mut seen = BTreeSet::new();
    let mut rules = Vec::new();

    for family in families() {
        let source = parse_rules(family.document, DocFormat::Toml, RuleOrigin::builtin())?;
        for rule in source.rules {
            if !seen.insert(rule.id.clone()) {
                return Err(LoadError::DuplicateId {
                    file: format!("builtin/{}", family.name),
                    rule_id: rule.id,
                });
            }
            rules.push(rule);
        }
    }

    Ok(RuleSource::new(RuleOrigin::builtin(), rules))
}
