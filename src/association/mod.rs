//! Associations
//!
//! An [`Association`] couples a rule variant with a live constraint tree
//! and the document being accumulated. Items are offered with [`add`]:
//! the tree is snapshotted, evaluated, and either the member merges in or
//! the tree rolls back, so a rejection is invisible afterwards.
//!
//! [`add`]: Association::add

pub mod document;
pub mod validator;

pub use document::{AsnDocument, Member, Product};
pub use validator::{DocumentValidator, ValidationIssue, ValidationResult};

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::constraint::{Constraint, EvalFacts};
use crate::engine::process::ReprocessRequest;
use crate::error::Result;
use crate::item::{Item, ItemId};
use crate::rules::RuleVariant;

/// Default candidate identifier for items carrying none
const DISCOVERED_ID: &str = "a0000";

/// One in-progress association: a rule, its constraint tree, and the
/// accumulated document
pub struct Association {
    rule: Arc<dyn RuleVariant>,
    tree: Constraint,
    document: AsnDocument,
    accepted: BTreeSet<ItemId>,
    ran_init: bool,
}

impl Association {
    /// Try to start a new association from the given item.
    ///
    /// Returns the association when the item satisfies the rule's fresh
    /// constraint tree, `None` otherwise. Reprocess requests raised during
    /// evaluation are returned either way.
    pub fn create(
        rule: Arc<dyn RuleVariant>,
        item: &Item,
        version_id: Option<&str>,
    ) -> (Option<Self>, Vec<ReprocessRequest>) {
        let asn_id = item
            .get_str("asn_candidate")
            .unwrap_or_else(|| DISCOVERED_ID.to_string());
        let asn_pool = item
            .get_str("asn_pool")
            .unwrap_or_else(|| "default_pool".to_string());
        let document = AsnDocument::new(
            rule.name(),
            rule.asn_type(),
            asn_id,
            asn_pool,
            version_id.map(String::from),
        );

        let mut assoc = Self {
            tree: rule.build_tree(),
            rule,
            document,
            accepted: BTreeSet::new(),
            ran_init: false,
        };
        let (matched, requests) = assoc.add(item);
        if matched {
            tracing::debug!(
                rule = assoc.rule.name(),
                item = %item.id(),
                "association created"
            );
            (Some(assoc), requests)
        } else {
            (None, requests)
        }
    }

    /// Offer an item to this association.
    ///
    /// Re-offering an accepted member is an idempotent no-op reporting a
    /// match. Otherwise the constraint tree is evaluated transactionally:
    /// a match merges the member and commits the tree's narrowed state, a
    /// failure restores the pre-offer snapshot exactly.
    pub fn add(&mut self, item: &Item) -> (bool, Vec<ReprocessRequest>) {
        if self.accepted.contains(&item.id()) {
            return (true, Vec::new());
        }

        let saved = self.tree.preserve();
        let role = self.rule.item_role(item);
        let facts = EvalFacts {
            has_science: self.document.has_science(),
            member_count: self.document.member_count(),
            role,
        };
        let mut verdict = self.tree.evaluate(item, &facts);

        // A fired force_match guard overrides the tree's own verdict.
        if self.tree.node_matched("force_match") {
            if let Some(forced) = self.tree.force_match_value() {
                verdict.matched = forced;
            }
        }

        for request in &mut verdict.requests {
            request.trigger_rules.insert(self.rule.name().to_string());
        }

        if verdict.matched {
            if !self.ran_init {
                self.rule.init_hook(&mut self.document, item);
                self.ran_init = true;
            }
            let exptype = self.rule.member_role(&self.tree, item);
            let product_name = self.rule.product_name(item);
            self.document
                .add_member(&product_name, self.rule.make_member(item, &exptype));
            self.accepted.insert(item.id());
        } else {
            self.tree.restore(saved);
        }

        (verdict.matched, verdict.requests)
    }

    /// True if the item has been accepted into this association
    pub fn is_member(&self, item: &Item) -> bool {
        self.accepted.contains(&item.id())
    }

    /// Validate the accumulated document against the rule's schema
    pub fn validate(&self) -> Result<ValidationResult> {
        let validator = DocumentValidator::new(self.rule.name(), self.rule.schema())?;
        Ok(validator.validate(&self.document))
    }

    /// True if the document currently passes validation
    pub fn is_valid(&self) -> bool {
        self.validate().map(|r| r.is_valid).unwrap_or(false)
    }

    /// Close out the association.
    ///
    /// An association that never became valid (e.g. a candidate that
    /// collected only non-science members) is discarded, not an error.
    /// `Err` signals rule misconfiguration only.
    pub fn finalize(self) -> Result<Option<Self>> {
        let result = self.validate()?;
        if result.is_valid {
            Ok(Some(self))
        } else {
            tracing::debug!(
                rule = self.rule.name(),
                asn_id = %self.document.asn_id,
                summary = %result.summary(),
                "discarding association that never became valid"
            );
            Ok(None)
        }
    }

    pub fn document(&self) -> &AsnDocument {
        &self.document
    }

    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    pub fn member_count(&self) -> usize {
        self.document.member_count()
    }

    /// File-name stem for serialized output: candidate id, version tag or
    /// timestamp, and association type
    pub fn asn_name(&self) -> String {
        let stamp = self
            .document
            .version_id
            .clone()
            .unwrap_or_else(|| chrono::Utc::now().format("%Y%m%dt%H%M%S").to_string());
        format!(
            "{}_{}_{}_asn",
            self.document.asn_id.to_lowercase(),
            stamp.to_lowercase(),
            self.document.asn_type.to_lowercase()
        )
    }

    /// JSON rendering of the constraint tree's mutable state, for
    /// comparing association states in tests
    pub fn state_fingerprint(&self) -> serde_json::Value {
        self.tree.state_fingerprint()
    }
}

impl std::fmt::Debug for Association {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Association")
            .field("rule", &self.rule.name())
            .field("asn_id", &self.document.asn_id)
            .field("members", &self.document.member_count())
            .finish_non_exhaustive()
    }
}
