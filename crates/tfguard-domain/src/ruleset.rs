//! The merged, selected set of rules a run evaluates.

use crate::rule::{Rule, RuleOrigin};
use std::collections::{BTreeMap, BTreeSet};
use tfguard_types::RuleInfo;
use tracing::debug;

/// Rules keyed by id, iterated in id order.
#[derive(Clone, Debug, Default)]
pub struct Ruleset {
    rules: BTreeMap<String, Rule>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule`, returning the definition it replaced.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.id.clone(), rule)
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Listing records in id order.
    pub fn list(&self) -> Vec<RuleInfo> {
        self.iter().map(Rule::info).collect()
    }

    /// Keep only what `selection` allows. Include narrows first, then exclude removes.
    pub fn select(mut self, selection: &Selection) -> Self {
        if !selection.include.is_empty() {
            self.rules.retain(|id, _| selection.include.contains(id));
        }
        self.rules.retain(|id, _| !selection.exclude.contains(id));
        self
    }
}

impl FromIterator<Rule> for Ruleset {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        let mut set = Ruleset::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

/// Rules loaded from one source, in declaration order.
#[derive(Clone, Debug)]
pub struct RuleSource {
    pub origin: RuleOrigin,
    pub rules: Vec<Rule>,
}

impl RuleSource {
    pub fn new(origin: RuleOrigin, rules: Vec<Rule>) -> Self {
        Self { origin, rules }
    }
}

/// Fold sources into one ruleset. Sources are ordered by kind (stable within a kind), and a
/// later source replaces an earlier rule with the same id wholesale.
pub fn merge_sources(mut sources: Vec<RuleSource>) -> Ruleset {
    sources.sort_by_key(|s| s.origin.kind);

    let mut merged = Ruleset::new();
    for source in sources {
        for rule in source.rules {
            let id = rule.id.clone();
            if let Some(previous) = merged.insert(rule) {
                debug!(
                    rule = %id,
                    from = %previous.origin,
                    by = %source.origin,
                    "rule definition replaced"
                );
            }
        }
    }
    merged
}

/// Include/exclude filter applied after merging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl Selection {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Ids named in either list that `ruleset` does not define.
    pub fn unknown_ids(&self, ruleset: &Ruleset) -> Vec<String> {
        self.include
            .union(&self.exclude)
            .filter(|id| !ruleset.contains(id))
            .cloned()
            .collect()
    }
}
