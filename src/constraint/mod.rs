//! Constraint trees
//!
//! A rule variant describes membership as a tree of constraints evaluated
//! against each offered item:
//!
//! ```text
//!  ConstraintGroup (all/any/notany/notall)
//!      ├── AttrConstraint   exp_type ~ "nrc_image|nis_image"
//!      ├── AttrConstraint   target   (binds first value, force-unique)
//!      └── ConstraintGroup (any)
//!            ├── GuardConstraint  item is a background exposure
//!            └── GuardConstraint  association has no science member yet
//! ```
//!
//! Evaluation is transactional from the association's point of view:
//! [`Constraint::preserve`] snapshots every piece of mutable node state
//! (bindings, found values, match flags) and [`Constraint::restore`] rolls
//! it back, so a rejected item leaves the tree byte-identical.
//!
//! Groups evaluate **every** child unconditionally. Constraint side effects
//! (value bindings) would otherwise depend on which operator wraps a node
//! and on sibling order, and the final association content must be a
//! function only of the accepted items.

mod attr;
mod group;
mod guard;

pub use attr::{AttrConstraint, Expected, MatchPattern, ReprocessOn};
pub use group::{ConstraintGroup, ReduceOp};
pub use guard::GuardConstraint;

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::engine::process::ReprocessRequest;
use crate::item::Item;

/// Association-level facts visible to guards and computed expectations.
///
/// This is a read-only snapshot assembled by the association before each
/// evaluation pass; constraints never hold references into live engine
/// state.
#[derive(Debug, Clone, Default)]
pub struct EvalFacts {
    /// True if the association already holds a science member
    pub has_science: bool,
    /// Number of members merged so far
    pub member_count: usize,
    /// The role the rule would assign this item (science, background, ...)
    pub role: String,
}

/// Evaluation context handed to guards and `Expected::Computed` closures
pub struct EvalContext<'a> {
    bindings: &'a BTreeMap<String, String>,
    facts: &'a EvalFacts,
}

impl<'a> EvalContext<'a> {
    /// Value a named sibling constraint has bound, if any
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn has_science(&self) -> bool {
        self.facts.has_science
    }

    pub fn member_count(&self) -> usize {
        self.facts.member_count
    }

    /// Role the owning rule resolves for the item under evaluation
    pub fn role(&self) -> &str {
        &self.facts.role
    }
}

/// Outcome of evaluating a constraint against one item
#[derive(Debug, Default)]
pub struct Verdict {
    /// Did the constraint match?
    pub matched: bool,
    /// Reprocessing obligations raised during evaluation, regardless of
    /// the verdict
    pub requests: Vec<ReprocessRequest>,
}

/// Opaque snapshot of a constraint tree's mutable state
#[derive(Clone)]
pub struct ConstraintState(Box<Constraint>);

/// A node in a rule's constraint tree
#[derive(Clone)]
pub enum Constraint {
    /// Atomic predicate over one of the item's attributes
    Attr(AttrConstraint),
    /// Predicate over the item and the evaluation context
    Guard(GuardConstraint),
    /// Ordered children combined with a reduce operator
    Group(ConstraintGroup),
}

impl Constraint {
    /// Evaluate the tree against one item.
    ///
    /// Node state mutates as matches commit; callers wanting transactional
    /// behavior snapshot with [`Constraint::preserve`] first and restore on
    /// a failed verdict.
    pub fn evaluate(&mut self, item: &Item, facts: &EvalFacts) -> Verdict {
        let mut bindings = BTreeMap::new();
        self.collect_bindings(&mut bindings);
        self.eval_inner(item, facts, &mut bindings)
    }

    /// Snapshot all mutable state
    pub fn preserve(&self) -> ConstraintState {
        ConstraintState(Box::new(self.clone()))
    }

    /// Roll back to a previously preserved snapshot
    pub fn restore(&mut self, state: ConstraintState) {
        *self = *state.0;
    }

    fn eval_inner(
        &mut self,
        item: &Item,
        facts: &EvalFacts,
        bindings: &mut BTreeMap<String, String>,
    ) -> Verdict {
        match self {
            Constraint::Attr(attr) => {
                let ctx = EvalContext { bindings, facts };
                let (matched, requests) = attr.evaluate(item, &ctx);
                if let (Some(name), Some(bound)) = (attr.name(), attr.bound()) {
                    bindings.insert(name.to_string(), bound.to_string());
                }
                Verdict { matched, requests }
            }
            Constraint::Guard(guard) => {
                let ctx = EvalContext { bindings, facts };
                let (matched, requests) = guard.evaluate(item, &ctx);
                Verdict { matched, requests }
            }
            Constraint::Group(group) => {
                // Every child runs; bindings committed by earlier siblings
                // are visible to later ones within the same pass.
                let mut results = Vec::with_capacity(group.children().len());
                let mut requests = Vec::new();
                for child in group.children_mut() {
                    let verdict = child.eval_inner(item, facts, bindings);
                    results.push(verdict.matched);
                    requests.extend(verdict.requests);
                }
                Verdict {
                    matched: group.op().reduce(&results),
                    requests,
                }
            }
        }
    }

    /// Walk the tree, recording `name -> bound value` for every narrowed
    /// named attribute constraint
    pub fn collect_bindings(&self, out: &mut BTreeMap<String, String>) {
        match self {
            Constraint::Attr(attr) => {
                if let (Some(name), Some(bound)) = (attr.name(), attr.bound()) {
                    out.insert(name.to_string(), bound.to_string());
                }
            }
            Constraint::Guard(_) => {}
            Constraint::Group(group) => {
                for child in group.children() {
                    child.collect_bindings(out);
                }
            }
        }
    }

    /// Find a named attribute constraint anywhere in the tree
    pub fn find_attr(&self, name: &str) -> Option<&AttrConstraint> {
        match self {
            Constraint::Attr(attr) if attr.name() == Some(name) => Some(attr),
            Constraint::Attr(_) | Constraint::Guard(_) => None,
            Constraint::Group(group) => {
                group.children().iter().find_map(|c| c.find_attr(name))
            }
        }
    }

    /// Find a named guard constraint anywhere in the tree
    pub fn find_guard(&self, name: &str) -> Option<&GuardConstraint> {
        match self {
            Constraint::Guard(guard) if guard.name() == Some(name) => Some(guard),
            Constraint::Attr(_) | Constraint::Guard(_) => None,
            Constraint::Group(group) => {
                group.children().iter().find_map(|c| c.find_guard(name))
            }
        }
    }

    /// True if the named node (attribute or guard) matched on its most
    /// recent evaluation
    pub fn node_matched(&self, name: &str) -> bool {
        self.find_attr(name).map(AttrConstraint::matched).unwrap_or(false)
            || self.find_guard(name).map(GuardConstraint::matched).unwrap_or(false)
    }

    /// Value of the special `force_match` guard, if one exists and is bound
    pub fn force_match_value(&self) -> Option<bool> {
        self.find_guard("force_match").and_then(GuardConstraint::value)
    }

    /// True for a group with no children; such a tree can never express a
    /// membership decision and registering it is a rule error
    pub fn is_empty(&self) -> bool {
        match self {
            Constraint::Group(group) => group.children().is_empty(),
            _ => false,
        }
    }

    /// JSON rendering of all mutable node state, used to compare tree
    /// states for deep equality
    pub fn state_fingerprint(&self) -> Value {
        match self {
            Constraint::Attr(attr) => attr.state_fingerprint(),
            Constraint::Guard(guard) => guard.state_fingerprint(),
            Constraint::Group(group) => json!({
                "group": group.op().as_str(),
                "children": group
                    .children()
                    .iter()
                    .map(Constraint::state_fingerprint)
                    .collect::<Vec<_>>(),
            }),
        }
    }
}

impl From<AttrConstraint> for Constraint {
    fn from(attr: AttrConstraint) -> Self {
        Constraint::Attr(attr)
    }
}

impl From<GuardConstraint> for Constraint {
    fn from(guard: GuardConstraint) -> Self {
        Constraint::Guard(guard)
    }
}

impl From<ConstraintGroup> for Constraint {
    fn from(group: ConstraintGroup) -> Self {
        Constraint::Group(group)
    }
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Attr(attr) => attr.fmt(f),
            Constraint::Guard(guard) => guard.fmt(f),
            Constraint::Group(group) => group.fmt(f),
        }
    }
}
