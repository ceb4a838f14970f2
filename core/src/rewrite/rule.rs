use regex::{Captures, Regex};
use serde::Serialize;

use crate::platform::BuildTarget;

/// How tightly a rule's matcher is tied to one known source shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// One literal shape from a known upstream build.
    Exact,
    /// Structural pattern tolerant of renamed identifiers and whitespace.
    Generalized,
    /// Splices new logic at a matched site rather than replacing it.
    Injection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    Both,
    GeneralOnly,
    WindowsOnly,
}

impl RuleScope {
    pub fn applies_to(self, target: BuildTarget) -> bool {
        match self {
            RuleScope::Both => true,
            RuleScope::GeneralOnly => !target.is_windows(),
            RuleScope::WindowsOnly => target.is_windows(),
        }
    }
}

/// Produces the replacement for one match; `None` leaves the match untouched.
pub type Expander = fn(&Captures<'_>, BuildTarget) -> Option<String>;

/// One (matcher, replacement) pair of the rewrite pipeline.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pub name: &'static str,
    pub kind: RuleKind,
    pub scope: RuleScope,
    /// Rules sharing a site are alternatives: only the first that matches fires.
    pub site: Option<&'static str>,
    pattern: Regex,
    expand: Expander,
}

impl RewriteRule {
    pub fn new(name: &'static str, kind: RuleKind, pattern: Regex, expand: Expander) -> Self {
        Self {
            name,
            kind,
            scope: RuleScope::Both,
            site: None,
            pattern,
            expand,
        }
    }

    pub fn scoped(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn at_site(mut self, site: &'static str) -> Self {
        self.site = Some(site);
        self
    }

    /// Replace every match in `source`, returning the new text and how many
    /// matches were actually rewritten.
    pub fn apply(&self, source: &str, target: BuildTarget) -> (String, usize) {
        let mut count = 0usize;
        let rewritten = self.pattern.replace_all(source, |caps: &Captures<'_>| match (self.expand)(caps, target) {
            Some(replacement) => {
                count += 1;
                replacement
            }
            None => caps[0].to_string(),
        });
        (rewritten.into_owned(), count)
    }
}
