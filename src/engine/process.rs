//! Reprocess requests and the worklist queue
//!
//! Constraint evaluation can raise reprocessing obligations: an item that
//! must be offered again once other items have been classified (e.g. a
//! direct image that belongs to a grism association formed later). Requests
//! are merged by `(item identity, category)` so an item is re-evaluated at
//! most once per category, with the union of all rules that asked for it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::item::{Item, ItemId};

/// Which part of the matching machinery a reprocessed item is offered to.
///
/// Categories drain in declaration order: new-rule offers first, plain
/// re-offers next, non-science pickup last (after every science exposure
/// has found its place).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    /// Offer only to rule factories (may create new associations)
    Rules,
    /// Offer to existing associations and rule factories
    Both,
    /// Offer only to existing associations
    Existing,
    /// Offer only to existing associations, after all science is placed
    NonScience,
}

impl Category {
    /// True if items in this category may spawn new associations
    pub fn offers_to_rules(&self) -> bool {
        matches!(self, Category::Rules | Category::Both)
    }

    /// True if items in this category are offered to existing associations
    pub fn offers_to_existing(&self) -> bool {
        matches!(self, Category::Both | Category::Existing | Category::NonScience)
    }
}

/// A request to re-offer an item to a restricted set of rule variants
#[derive(Debug, Clone)]
pub struct ReprocessRequest {
    /// The item to re-evaluate
    pub item: Item,
    /// Where to re-offer it
    pub category: Category,
    /// Rule names the re-offer is restricted to. Associations fill in
    /// their own rule name on every request they raise; an empty set means
    /// the raising constraint ran outside any association and the request
    /// applies to all rules.
    pub trigger_rules: BTreeSet<String>,
}

impl ReprocessRequest {
    pub fn new(item: Item, category: Category) -> Self {
        Self {
            item,
            category,
            trigger_rules: BTreeSet::new(),
        }
    }
}

/// Pending reprocess requests, keyed by `(item identity, category)`.
///
/// Popping follows category order, FIFO within a category. Merging a
/// request for a key that is already pending unions the trigger rules
/// instead of queueing a duplicate evaluation. Each key is served at most
/// once: re-raising a request during its own drained re-offer (a node
/// whose reprocess option fires again on re-evaluation) is absorbed, so
/// the queue reaches a fixpoint instead of regenerating itself.
#[derive(Debug, Default)]
pub struct ProcessQueue {
    pending: BTreeMap<Category, VecDeque<ReprocessRequest>>,
    served: BTreeSet<(ItemId, Category)>,
}

impl ProcessQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a request into the queue
    pub fn push(&mut self, request: ReprocessRequest) {
        if self
            .served
            .contains(&(request.item.id(), request.category))
        {
            return;
        }
        let bucket = self.pending.entry(request.category).or_default();
        if let Some(existing) = bucket.iter_mut().find(|r| r.item.id() == request.item.id()) {
            // An empty trigger set means the request applies to every
            // rule; merging must keep it universal, not narrow it.
            if existing.trigger_rules.is_empty() || request.trigger_rules.is_empty() {
                existing.trigger_rules.clear();
            } else {
                existing.trigger_rules.extend(request.trigger_rules);
            }
            return;
        }
        bucket.push_back(request);
    }

    /// Merge a batch of requests
    pub fn extend(&mut self, requests: impl IntoIterator<Item = ReprocessRequest>) {
        for request in requests {
            self.push(request);
        }
    }

    /// Pop the next request: lowest category first, FIFO within it.
    /// The popped key is recorded as served and never queued again.
    pub fn pop(&mut self) -> Option<ReprocessRequest> {
        let (&category, _) = self.pending.iter().find(|(_, bucket)| !bucket.is_empty())?;
        let request = self.pending.get_mut(&category)?.pop_front();
        if self
            .pending
            .get(&category)
            .is_some_and(|bucket| bucket.is_empty())
        {
            self.pending.remove(&category);
        }
        if let Some(request) = &request {
            self.served.insert((request.item.id(), request.category));
        }
        request
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(|bucket| bucket.is_empty())
    }

    /// Total pending requests
    pub fn len(&self) -> usize {
        self.pending.values().map(|bucket| bucket.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    fn item(expname: &str) -> Item {
        Item::builder().attr("expname", expname).build()
    }

    #[test]
    fn test_merge_unions_trigger_rules() {
        let mut queue = ProcessQueue::new();

        let mut first = ReprocessRequest::new(item("a.fits"), Category::NonScience);
        first.trigger_rules.insert("wfss".to_string());
        queue.push(first);

        let mut second = ReprocessRequest::new(item("a.fits"), Category::NonScience);
        second.trigger_rules.insert("image".to_string());
        queue.push(second);

        assert_eq!(queue.len(), 1);
        let merged = queue.pop().unwrap();
        assert_eq!(merged.trigger_rules.len(), 2);
        assert!(merged.trigger_rules.contains("wfss"));
        assert!(merged.trigger_rules.contains("image"));
    }

    #[test]
    fn test_drained_request_is_never_requeued() {
        let mut queue = ProcessQueue::new();
        queue.push(ReprocessRequest::new(item("a.fits"), Category::NonScience));
        assert!(queue.pop().is_some());

        // The re-offer fires the same reprocess option again; the queue
        // must absorb it or generation never reaches a fixpoint.
        queue.push(ReprocessRequest::new(item("a.fits"), Category::NonScience));
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());

        // A different category for the same item is a fresh key.
        queue.push(ReprocessRequest::new(item("a.fits"), Category::Existing));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_merge_keeps_universal_requests_universal() {
        let mut queue = ProcessQueue::new();
        queue.push(ReprocessRequest::new(item("a.fits"), Category::Existing));

        let mut restricted = ReprocessRequest::new(item("a.fits"), Category::Existing);
        restricted.trigger_rules.insert("wfss".to_string());
        queue.push(restricted);

        // An empty trigger set means "offer to every rule"; the merge
        // must not narrow it to the restricted set.
        assert!(queue.pop().unwrap().trigger_rules.is_empty());
    }

    #[test]
    fn test_same_item_different_categories_stay_separate() {
        let mut queue = ProcessQueue::new();
        queue.push(ReprocessRequest::new(item("a.fits"), Category::Existing));
        queue.push(ReprocessRequest::new(item("a.fits"), Category::NonScience));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_pop_order_is_category_then_fifo() {
        let mut queue = ProcessQueue::new();
        queue.push(ReprocessRequest::new(item("late.fits"), Category::NonScience));
        queue.push(ReprocessRequest::new(item("first.fits"), Category::Existing));
        queue.push(ReprocessRequest::new(item("second.fits"), Category::Existing));

        assert_eq!(queue.pop().unwrap().item.id(), "first.fits");
        assert_eq!(queue.pop().unwrap().item.id(), "second.fits");
        assert_eq!(queue.pop().unwrap().item.id(), "late.fits");
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_category_offer_targets() {
        assert!(Category::Both.offers_to_rules());
        assert!(Category::Both.offers_to_existing());
        assert!(Category::Rules.offers_to_rules());
        assert!(!Category::Rules.offers_to_existing());
        assert!(!Category::NonScience.offers_to_rules());
        assert!(Category::NonScience.offers_to_existing());
    }
}
