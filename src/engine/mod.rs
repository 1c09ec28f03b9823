//! Match engine
//!
//! Drives generation to a fixpoint: every pool item is offered once, and
//! reprocess requests raised along the way are drained in category order
//! until the queue empties. The published result is a function of the
//! pool's contents, not of who asked for reprocessing when.

pub mod process;

pub use process::{Category, ProcessQueue, ReprocessRequest};

use std::collections::{BTreeMap, BTreeSet};

use crate::association::{AsnDocument, Association};
use crate::error::Result;
use crate::item::Item;
use crate::registry::RuleRegistry;

/// Guard against pathological reprocess cycles in plugged-in rule sets
const DEFAULT_MAX_ROUNDS: usize = 100_000;

/// Association generator over a rule registry
pub struct MatchEngine {
    registry: RuleRegistry,
    version_id: Option<String>,
    max_rounds: usize,
}

impl MatchEngine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            version_id: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Tag produced associations with a version identifier, woven into
    /// association names in place of the timestamp
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Override the reprocessing round cap
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Generate all associations for a pool of items.
    ///
    /// Returns finalized documents ordered by candidate id, then type and
    /// rule. Associations that never became valid are dropped silently.
    pub fn generate(&self, pool: &[Item]) -> Result<Vec<AsnDocument>> {
        let mut queue = ProcessQueue::new();
        queue.extend(
            pool.iter()
                .map(|item| ReprocessRequest::new(item.clone(), Category::Both)),
        );

        let mut associations: Vec<Association> = Vec::new();
        let mut rounds = 0usize;

        while let Some(request) = queue.pop() {
            rounds += 1;
            if rounds > self.max_rounds {
                tracing::warn!(
                    max_rounds = self.max_rounds,
                    dropped = queue.len() + 1,
                    "reprocessing cap reached; dropping remaining requests"
                );
                break;
            }
            self.offer(&request, &mut associations, &mut queue);
        }

        tracing::info!(
            items = pool.len(),
            rounds,
            candidates = associations.len(),
            "pool processed"
        );

        let mut documents = Vec::new();
        for assoc in associations {
            if let Some(finalized) = assoc.finalize()? {
                documents.push(finalized.document().clone());
            }
        }
        documents.sort_by(|a, b| {
            (&a.asn_id, &a.asn_type, &a.asn_rule).cmp(&(&b.asn_id, &b.asn_type, &b.asn_rule))
        });

        log_duplicate_products(&documents);
        Ok(documents)
    }

    /// One offer round: existing associations first, then rule factories,
    /// skipping factories whose existing association already took the item
    fn offer(
        &self,
        request: &ReprocessRequest,
        associations: &mut Vec<Association>,
        queue: &mut ProcessQueue,
    ) {
        let mut matched_rules: BTreeSet<String> = BTreeSet::new();

        if request.category.offers_to_existing() {
            for assoc in associations.iter_mut() {
                // A non-empty trigger set limits the re-offer to the rules
                // that asked for it.
                if !request.trigger_rules.is_empty()
                    && !request.trigger_rules.contains(assoc.rule_name())
                {
                    continue;
                }
                let (matched, requests) = assoc.add(&request.item);
                if matched {
                    matched_rules.insert(assoc.rule_name().to_string());
                }
                queue.extend(requests);
            }
        }

        if request.category.offers_to_rules() {
            let (created, requests) = self.registry.match_all(
                &request.item,
                self.version_id.as_deref(),
                &matched_rules,
                &request.trigger_rules,
            );
            associations.extend(created);
            queue.extend(requests);
        }
    }
}

/// Distinct associations naming the same product usually indicate a rule
/// overlap worth investigating; surfaced at debug so well-known overlaps
/// stay quiet in production
fn log_duplicate_products(documents: &[AsnDocument]) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in documents {
        for product in &doc.products {
            *counts.entry(product.name.as_str()).or_default() += 1;
        }
    }
    for (name, count) in counts {
        if count > 1 {
            tracing::debug!(product = name, count, "product name appears in multiple associations");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::standard_rules;

    fn image_item(expname: &str, target: &str) -> Item {
        Item::builder()
            .attr("expname", expname)
            .attr("instrume", "nircam")
            .attr("exp_type", "nrc_image")
            .attr("detector", "nrca1")
            .attr("targetid", target)
            .attr("asn_candidate", "o001")
            .attr("asn_pool", "pool_001")
            .build()
    }

    #[test]
    fn test_pool_items_group_by_target() {
        let engine = MatchEngine::new(standard_rules().unwrap());
        let pool = vec![
            image_item("jw001_a_rate.fits", "1"),
            image_item("jw001_b_rate.fits", "1"),
            image_item("jw001_c_rate.fits", "2"),
        ];

        let docs = engine.generate(&pool).unwrap();
        assert_eq!(docs.len(), 2);

        let counts: Vec<usize> = docs
            .iter()
            .map(|d| d.products.iter().map(|p| p.members.len()).sum())
            .collect();
        let mut sorted = counts.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2]);
    }

    #[test]
    fn test_unplaceable_reprocessed_item_reaches_fixpoint() {
        // A direct image whose pickup request no association can serve
        // re-fires its reprocess option on every rejected re-offer; the
        // queue must absorb that instead of cycling until the round cap.
        let engine = MatchEngine::new(standard_rules().unwrap()).with_max_rounds(32);
        let pool = vec![
            Item::builder()
                .attr("expname", "jw002_grism_rate.fits")
                .attr("instrume", "niriss")
                .attr("exp_type", "nis_wfss")
                .attr("targetid", "7")
                .attr("asn_pool", "pool_001")
                .build(),
            image_item("jw001_a_rate.fits", "1"),
        ];

        let docs = engine.generate(&pool).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_round_cap_terminates_generation() {
        let engine = MatchEngine::new(standard_rules().unwrap()).with_max_rounds(1);
        let pool = vec![
            image_item("jw001_a_rate.fits", "1"),
            image_item("jw001_b_rate.fits", "1"),
        ];
        // Only one request drains; the run still terminates and yields
        // whatever was formed by then.
        let docs = engine.generate(&pool).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_empty_pool_yields_no_documents() {
        let engine = MatchEngine::new(standard_rules().unwrap());
        assert!(engine.generate(&[]).unwrap().is_empty());
    }
}
