//! The per-page reconciling store.
//!
//! Each page has two independent data sources: a one-shot historical batch
//! and an open-ended stream of realtime events. The two arrive in no
//! particular order relative to each other; the merge below makes the final
//! content independent of that order. State is published as an immutable
//! snapshot whose identity changes exactly when the content changes, so
//! consumers can detect updates by pointer comparison.

use crate::types::{AnnotationId, AnnotationRecord};
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable, time-ordered view of one page's annotations.
///
/// Snapshots share storage; cloning is cheap. A store publishes a new
/// identity on every content change and keeps the identity stable
/// otherwise, so [`Snapshot::ptr_eq`] answers "did anything change".
#[derive(Clone, Debug)]
pub struct Snapshot<T>(Arc<[T]>);

impl<T> Snapshot<T> {
    /// Whether two snapshots are the same published state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for Snapshot<T> {
    fn from(items: Vec<T>) -> Self {
        Snapshot(items.into())
    }
}

/// Reconciles one page's historical batch with its realtime stream.
///
/// Holds the set of ids ever admitted (deduplication, including deleted
/// ids) and the published ascending-by-creation-time snapshot. Not
/// internally synchronized; the feed layer wraps one store per page in a
/// mutex and serializes access.
pub struct PageStore<T> {
    /// Every id ever admitted, including since-deleted ones.
    seen: HashSet<AnnotationId>,
    /// Published snapshot, ascending by creation time.
    ordered: Snapshot<T>,
}

impl<T: AnnotationRecord> PageStore<T> {
    pub fn new() -> Self {
        PageStore {
            seen: HashSet::new(),
            ordered: Snapshot::from(Vec::new()),
        }
    }

    /// Current snapshot. Identity is stable until the next mutation.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.ordered.clone()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Merge the historical batch. `batch` must be ascending by creation
    /// time (the bridge reverses the backend's newest-first read).
    ///
    /// An empty seen set means nothing has been admitted yet and the batch
    /// is adopted verbatim. Otherwise realtime events won the race with the
    /// fetch: the batch is reduced to unseen ids and woven into the live
    /// list. Ids the realtime stream already delivered, or delivered and
    /// deleted, stay suppressed.
    pub fn set_past_items(&mut self, batch: Vec<T>) {
        if self.seen.is_empty() {
            self.seen.extend(batch.iter().map(|item| item.id().clone()));
            self.ordered = Snapshot::from(batch);
            return;
        }

        let mut merged: Vec<T> = batch
            .into_iter()
            .filter(|item| !self.seen.contains(item.id()))
            .collect();
        self.seen.extend(merged.iter().map(|item| item.id().clone()));
        merged.extend(self.ordered.iter().cloned());
        // Stable sort: equal timestamps keep historical items ahead of
        // realtime ones, matching the concatenation order.
        merged.sort_by(|a, b| a.created_at().cmp(b.created_at()));
        self.ordered = Snapshot::from(merged);
    }

    /// Admit one realtime creation. Duplicate deliveries are no-ops.
    pub fn add_realtime_item(&mut self, item: T) {
        if !self.seen.insert(item.id().clone()) {
            return;
        }
        let mut items: Vec<T> = self.ordered.to_vec();
        items.push(item);
        items.sort_by(|a, b| a.created_at().cmp(b.created_at()));
        self.ordered = Snapshot::from(items);
    }

    /// Drop one annotation from the published list. Unknown ids are no-ops.
    ///
    /// The id stays in the seen set: a historical batch resolving after the
    /// deletion must treat the record as already known, not resurrect it.
    /// Consequence inherited from the backend contract: if the backend ever
    /// reused a deleted id for an unrelated annotation, it would stay
    /// suppressed here.
    pub fn remove_realtime_item(&mut self, id: &AnnotationId) {
        let Some(index) = self.ordered.iter().position(|item| item.id() == id) else {
            return;
        };
        let mut items: Vec<T> = self.ordered.to_vec();
        items.remove(index);
        self.ordered = Snapshot::from(items);
    }
}

impl<T: AnnotationRecord> Default for PageStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
