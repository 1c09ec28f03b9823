//! Guard constraints
//!
//! Predicates that look at the item and the evaluation context rather than
//! matching a single attribute against a pattern: "the association has no
//! science member yet", "this value differs from the bound dither index".
//!
//! A guard named `force_match` is special: when its value is bound, the
//! owning association uses it to override the tree's boolean outcome
//! outright (see `Association::add`).

use std::sync::Arc;

use serde_json::{json, Value};

use super::EvalContext;
use crate::engine::process::{Category, ReprocessRequest};
use crate::item::Item;

type GuardTest = Arc<dyn Fn(&Item, &EvalContext) -> bool + Send + Sync>;

/// Predicate constraint over the item and evaluation context
#[derive(Clone)]
pub struct GuardConstraint {
    name: Option<String>,
    test: GuardTest,
    bind_on_match: Option<bool>,
    value: Option<bool>,
    matched: bool,
    vacuous: bool,
    reprocess: Option<Category>,
}

impl GuardConstraint {
    /// New guard from a predicate
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&Item, &EvalContext) -> bool + Send + Sync + 'static,
    {
        Self {
            name: None,
            test: Arc::new(test),
            bind_on_match: None,
            value: None,
            matched: false,
            vacuous: false,
            reprocess: None,
        }
    }

    /// Label the guard so rules can look it up after evaluation
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind the given value the first time the predicate passes. The bound
    /// value of a `force_match` guard overrides the tree verdict.
    pub fn bind_on_match(mut self, value: bool) -> Self {
        self.bind_on_match = Some(value);
        self
    }

    /// The guard never votes in its group's reduce: evaluation always
    /// reports a pass, while the predicate still drives `matched`, value
    /// binding, and reprocessing. This is how an override guard sits
    /// inside an `all` group without vetoing every ordinary item.
    pub fn vacuous(mut self) -> Self {
        self.vacuous = true;
        self
    }

    /// Raise a reprocess request for the item whenever the predicate
    /// passes
    pub fn reprocess_on_match(mut self, category: Category) -> Self {
        self.reprocess = Some(category);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Bound value, if the guard has fired with a binding configured
    pub fn value(&self) -> Option<bool> {
        self.value
    }

    /// True if the most recent evaluation passed
    pub fn matched(&self) -> bool {
        self.matched
    }

    pub(super) fn evaluate(
        &mut self,
        item: &Item,
        ctx: &EvalContext,
    ) -> (bool, Vec<ReprocessRequest>) {
        let pass = (self.test)(item, ctx);
        if pass && self.value.is_none() {
            self.value = self.bind_on_match;
        }
        self.matched = pass;

        let mut requests = Vec::new();
        if pass {
            if let Some(category) = self.reprocess {
                requests.push(ReprocessRequest::new(item.clone(), category));
            }
        }
        (pass || self.vacuous, requests)
    }

    pub(super) fn state_fingerprint(&self) -> Value {
        json!({
            "guard": self.name,
            "value": self.value,
            "matched": self.matched,
        })
    }
}

impl std::fmt::Debug for GuardConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardConstraint")
            .field("name", &self.name)
            .field("bind_on_match", &self.bind_on_match)
            .field("value", &self.value)
            .field("matched", &self.matched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Constraint, EvalFacts};

    #[test]
    fn test_guard_reads_association_facts() {
        let mut tree: Constraint =
            GuardConstraint::new(|_, ctx| !ctx.has_science() || ctx.role() != "science").into();

        let item = Item::builder().attr("expname", "a.fits").build();
        let first = EvalFacts {
            has_science: false,
            member_count: 0,
            role: "science".to_string(),
        };
        assert!(tree.evaluate(&item, &first).matched);

        let second_science = EvalFacts {
            has_science: true,
            member_count: 1,
            role: "science".to_string(),
        };
        assert!(!tree.evaluate(&item, &second_science).matched);
    }

    #[test]
    fn test_vacuous_guard_passes_without_firing() {
        let mut tree: Constraint = GuardConstraint::new(|_, ctx| ctx.has_science())
            .named("force_match")
            .bind_on_match(false)
            .vacuous()
            .into();

        // The predicate fails, but the guard must not veto the group.
        let item = Item::builder().attr("expname", "a.fits").build();
        let verdict = tree.evaluate(&item, &EvalFacts::default());
        assert!(verdict.matched);
        assert!(!tree.node_matched("force_match"));
        assert!(tree.force_match_value().is_none());

        // When the predicate fires, the veto value binds as usual.
        let science = EvalFacts {
            has_science: true,
            member_count: 1,
            role: "science".to_string(),
        };
        assert!(tree.evaluate(&item, &science).matched);
        assert_eq!(tree.force_match_value(), Some(false));
    }

    #[test]
    fn test_bind_on_match_binds_once() {
        let mut tree: Constraint = GuardConstraint::new(|_, _| true)
            .named("force_match")
            .bind_on_match(false)
            .into();

        let item = Item::builder().attr("expname", "a.fits").build();
        assert!(tree.find_guard("force_match").unwrap().value().is_none());
        tree.evaluate(&item, &EvalFacts::default());
        assert_eq!(tree.force_match_value(), Some(false));
    }
}
