//! Attribute constraints
//!
//! The atomic predicate of a constraint tree: resolve a value from the
//! item, compare it against the expected pattern, and commit binding side
//! effects on a match.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};

use super::EvalContext;
use crate::engine::process::{Category, ReprocessRequest};
use crate::item::Item;

/// What an attribute constraint expects of the resolved value
#[derive(Clone)]
pub enum Expected {
    /// Anything matches; binding behavior depends on `force_unique`
    Unbound,
    /// A regex alternation of literal alternatives (`a|b|c`), matched
    /// case-insensitively against the full value
    Pattern(MatchPattern),
    /// A pattern produced at match time from the currently-bound sibling
    /// values; an unresolvable expectation never matches
    Computed(Arc<dyn Fn(&EvalContext) -> Option<String> + Send + Sync>),
}

impl std::fmt::Debug for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Unbound => write!(f, "Unbound"),
            Expected::Pattern(p) => write!(f, "Pattern({:?})", p.raw()),
            Expected::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// An alternation pattern compiled once, matched case-insensitively
/// against the full value. A pattern that does not compile never matches;
/// rule authors control the pattern set.
#[derive(Clone)]
pub struct MatchPattern {
    raw: String,
    compiled: Option<Regex>,
}

impl MatchPattern {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let compiled = match Regex::new(&format!("(?i)^(?:{raw})$")) {
            Ok(re) => Some(re),
            Err(err) => {
                tracing::warn!(pattern = %raw, %err, "constraint pattern failed to compile");
                None
            }
        };
        Self { raw, compiled }
    }

    /// Pattern matching exactly the given value
    pub fn literal(value: &str) -> Self {
        Self::new(regex::escape(value))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, value: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(value))
    }
}

impl std::fmt::Debug for MatchPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchPattern({:?})", self.raw)
    }
}

/// Which evaluation outcome fires a node's reprocess request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprocessOn {
    Match,
    Fail,
}

/// Atomic predicate over one record attribute set, with value binding and
/// uniqueness tracking
#[derive(Debug, Clone)]
pub struct AttrConstraint {
    name: Option<String>,
    sources: Vec<String>,
    expected: Expected,
    required: bool,
    force_unique: bool,
    reprocess: Option<(Category, ReprocessOn)>,
    found_values: BTreeSet<String>,
    matched: bool,
    bound: Option<String>,
}

impl AttrConstraint {
    /// New constraint over the given candidate attributes, scanned in
    /// order. Defaults: required, not force-unique, unbound expectation.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            sources: sources.into_iter().map(Into::into).collect(),
            expected: Expected::Unbound,
            required: true,
            force_unique: false,
            reprocess: None,
            found_values: BTreeSet::new(),
            matched: false,
            bound: None,
        }
    }

    /// Label the constraint so siblings and rules can look it up
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Expect values matching a regex alternation of literals
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.expected = Expected::Pattern(MatchPattern::new(pattern));
        self
    }

    /// Expect a pattern computed from bound sibling values at match time
    pub fn computed<F>(mut self, f: F) -> Self
    where
        F: Fn(&EvalContext) -> Option<String> + Send + Sync + 'static,
    {
        self.expected = Expected::Computed(Arc::new(f));
        self
    }

    /// Items lacking every source attribute pass vacuously instead of
    /// failing
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// The first match permanently narrows the expectation to exactly the
    /// matched value: the attribute must be constant across the whole
    /// association
    pub fn force_unique(mut self) -> Self {
        self.force_unique = true;
        self
    }

    /// Raise a reprocess request for the evaluated item on the given
    /// outcome
    pub fn reprocess(mut self, category: Category, on: ReprocessOn) -> Self {
        self.reprocess = Some((category, on));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Raw value the constraint has narrowed to, if any
    pub fn bound(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    /// True if the most recent evaluation matched a resolved value
    pub fn matched(&self) -> bool {
        self.matched
    }

    /// Every value this constraint has matched so far
    pub fn found_values(&self) -> &BTreeSet<String> {
        &self.found_values
    }

    pub(super) fn evaluate(
        &mut self,
        item: &Item,
        ctx: &EvalContext,
    ) -> (bool, Vec<ReprocessRequest>) {
        let mut requests = Vec::new();

        let Some(value) = self.sources.iter().find_map(|s| item.get_str(s)) else {
            // No candidate attribute present: vacuous pass when optional.
            self.matched = false;
            return (!self.required, requests);
        };

        let pass = match &self.expected {
            Expected::Unbound => true,
            Expected::Pattern(pattern) => pattern.matches(&value),
            // Computed expectations depend on sibling bindings, so they
            // compile at match time by necessity.
            Expected::Computed(f) => match f(ctx) {
                Some(pattern) => MatchPattern::new(pattern).matches(&value),
                None => false,
            },
        };

        if pass {
            self.found_values.insert(value.clone());
            if self.force_unique {
                self.expected = Expected::Pattern(MatchPattern::literal(&value));
                self.bound = Some(value);
                self.force_unique = false;
            }
        }
        self.matched = pass;

        if let Some((category, on)) = self.reprocess {
            let fire = match on {
                ReprocessOn::Match => pass,
                ReprocessOn::Fail => !pass,
            };
            if fire {
                requests.push(ReprocessRequest::new(item.clone(), category));
            }
        }

        (pass, requests)
    }

    pub(super) fn state_fingerprint(&self) -> Value {
        let expected = match &self.expected {
            Expected::Unbound => Value::Null,
            Expected::Pattern(p) => Value::String(p.raw().to_string()),
            Expected::Computed(_) => Value::String("<computed>".to_string()),
        };
        json!({
            "attr": self.name,
            "sources": self.sources,
            "expected": expected,
            "force_unique": self.force_unique,
            "found_values": self.found_values,
            "matched": self.matched,
            "bound": self.bound,
        })
    }
}
