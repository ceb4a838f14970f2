//! Pattern-based source rewriter.
//!
//! Operates on generated (minified) source text, so matching is advisory: a
//! rule that finds nothing is logged and skipped, never an error.

mod rule;
pub mod rules;


use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::platform::BuildTarget;

pub use rule::{Expander, RewriteRule, RuleKind, RuleScope};

static SHEBANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A#![^\n]*\n").expect("shebang pattern must compile"));

/// A rule that rewrote at least one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleHit {
    pub rule: &'static str,
    pub kind: RuleKind,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteResult {
    #[serde(skip)]
    pub source: String,
    pub hits: Vec<RuleHit>,
    /// Applicable rules that matched nothing.
    pub misses: Vec<&'static str>,
    /// Alternatives not tried because another rule already handled their site.
    pub superseded: Vec<&'static str>,
}

impl RewriteResult {
    pub fn fired(&self, rule: &str) -> bool {
        self.hits.iter().any(|hit| hit.rule == rule)
    }
}

pub struct Rewriter {
    target: BuildTarget,
    rules: Vec<RewriteRule>,
}

impl Rewriter {
    /// The full pipeline for `target`.
    pub fn new(target: BuildTarget) -> Self {
        Self::with_rules(target, rules::default_rules())
    }

    pub fn with_rules(target: BuildTarget, rules: Vec<RewriteRule>) -> Self {
        Self { target, rules }
    }

    /// Rules that will run for this target, in order.
    pub fn active_rules(&self) -> impl Iterator<Item = &RewriteRule> {
        self.rules.iter().filter(|rule| rule.scope.applies_to(self.target))
    }

    /// Insert `prelude` after any leading `#!` line, then rewrite the rest.
    /// The prelude itself is never matched against.
    pub fn rewrite(&self, source: &str, prelude: &str) -> RewriteResult {
        let (shebang, body) = split_shebang(source);
        let mut result = self.apply(body);

        let mut out = String::with_capacity(shebang.len() + prelude.len() + result.source.len() + 1);
        out.push_str(shebang);
        out.push_str(prelude);
        if !prelude.is_empty() && !prelude.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&result.source);
        result.source = out;
        result
    }

    /// Run every active rule in order over `source`.
    pub fn apply(&self, source: &str) -> RewriteResult {
        let mut text = source.to_string();
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        let mut superseded = Vec::new();
        let mut handled_sites: HashSet<&'static str> = HashSet::new();

        for rule in self.active_rules() {
            if let Some(site) = rule.site
                && handled_sites.contains(site)
            {
                superseded.push(rule.name);
                continue;
            }

            let (next, count) = rule.apply(&text, self.target);
            if count == 0 {
                info!("rule '{}' found no match; leaving source unchanged", rule.name);
                misses.push(rule.name);
                continue;
            }

            info!("rule '{}' rewrote {} site(s)", rule.name, count);
            text = next;
            hits.push(RuleHit {
                rule: rule.name,
                kind: rule.kind,
                count,
            });
            if let Some(site) = rule.site {
                handled_sites.insert(site);
            }
        }

        RewriteResult {
            source: text,
            hits,
            misses,
            superseded,
        }
    }
}

/// Split a leading interpreter directive (including its newline) from the body.
pub fn split_shebang(source: &str) -> (&str, &str) {
    match SHEBANG_RE.find(source) {
        Some(m) => source.split_at(m.end()),
        None => ("", source),
    }
}
