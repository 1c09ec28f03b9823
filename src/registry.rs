//! Rule registry
//!
//! The ordered catalog of rule variants the engine offers items to.
//! Registration is fail-fast: duplicate names, empty constraint trees,
//! and uncompilable schemas are caught here instead of surfacing as
//! silent mismatches mid-generation.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::association::{Association, DocumentValidator};
use crate::engine::process::ReprocessRequest;
use crate::error::{AsnError, Result};
use crate::item::Item;
use crate::rules::RuleVariant;

/// Ordered catalog of registered rule variants
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn RuleVariant>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, validating its configuration
    pub fn register(&mut self, rule: impl RuleVariant + 'static) -> Result<()> {
        if self.get(rule.name()).is_some() {
            return Err(AsnError::RuleMisconfigured {
                rule: rule.name().to_string(),
                reason: "duplicate registration".to_string(),
            });
        }
        if rule.build_tree().is_empty() {
            return Err(AsnError::RuleMisconfigured {
                rule: rule.name().to_string(),
                reason: "empty constraint tree".to_string(),
            });
        }
        // Compiling the schema now keeps finalize-time failures out of the
        // data path.
        DocumentValidator::new(rule.name(), rule.schema())?;

        tracing::debug!(rule = rule.name(), asn_type = rule.asn_type(), "rule registered");
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    /// Look up a rule by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn RuleVariant>> {
        self.rules.iter().find(|r| r.name() == name).cloned()
    }

    /// Registered rule names, in offer order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Offer an item to every eligible rule factory.
    ///
    /// `skip` names rules whose existing associations already accepted the
    /// item this round; a non-empty `restrict` limits the offer to the
    /// named rules (a reprocess request's trigger set).
    pub fn match_all(
        &self,
        item: &Item,
        version_id: Option<&str>,
        skip: &BTreeSet<String>,
        restrict: &BTreeSet<String>,
    ) -> (Vec<Association>, Vec<ReprocessRequest>) {
        let mut created = Vec::new();
        let mut requests = Vec::new();

        for rule in &self.rules {
            if skip.contains(rule.name()) {
                continue;
            }
            if !restrict.is_empty() && !restrict.contains(rule.name()) {
                continue;
            }
            let (assoc, reqs) = Association::create(Arc::clone(rule), item, version_id);
            requests.extend(reqs);
            created.extend(assoc);
        }

        (created, requests)
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
