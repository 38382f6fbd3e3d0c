//! Shared per-page feed state: the reconciling store plus its watchers.

use super::types::{DropReason, FeedEvent, WatcherId};
use crate::reconcile::{PageStore, Snapshot};
use crate::types::{AnnotationId, AnnotationRecord, PageId};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// One page's store and the consumers watching it.
///
/// Every consumer of a page shares one feed (one source of truth per page
/// per process); the registry hands the same instance to each subscriber.
/// The store mutex serializes the backfill thread against realtime
/// callbacks, so handlers never run concurrently for the same store.
pub struct PageFeed<T> {
    page_id: PageId,
    store: Mutex<PageStore<T>>,
    watchers: Mutex<HashMap<WatcherId, Sender<FeedEvent>>>,
    next_watcher: AtomicU64,
    backfill_started: AtomicBool,
}

impl<T: AnnotationRecord> PageFeed<T> {
    pub(crate) fn new(page_id: PageId) -> Self {
        PageFeed {
            page_id,
            store: Mutex::new(PageStore::new()),
            watchers: Mutex::new(HashMap::new()),
            next_watcher: AtomicU64::new(1),
            backfill_started: AtomicBool::new(false),
        }
    }

    pub fn page_id(&self) -> &PageId {
        &self.page_id
    }

    /// Current snapshot of the page's annotations.
    pub fn snapshot(&self) -> Snapshot<T> {
        self.store.lock().snapshot()
    }

    /// Number of attached consumers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    pub(crate) fn attach(&self, buffer_size: usize) -> (WatcherId, Receiver<FeedEvent>) {
        let id = WatcherId(self.next_watcher.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(buffer_size);
        self.watchers.lock().insert(id, sender);
        (id, receiver)
    }

    pub(crate) fn detach(&self, id: WatcherId) {
        if let Some(sender) = self.watchers.lock().remove(&id) {
            let _ = sender.try_send(FeedEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Claim the one-shot historical backfill. True for the first caller.
    pub(crate) fn claim_backfill(&self) -> bool {
        !self.backfill_started.swap(true, Ordering::SeqCst)
    }

    /// Merge the resolved historical batch and wake consumers.
    ///
    /// Safe to call after every consumer detached: the store stays
    /// registered and keeps the merged state for the next subscription.
    pub(crate) fn apply_backfill(&self, batch: Vec<T>) {
        self.store.lock().set_past_items(batch);
        self.notify(FeedEvent::Backfilled);
    }

    /// Admit a realtime creation and wake consumers.
    pub(crate) fn apply_created(&self, item: T) {
        self.store.lock().add_realtime_item(item);
        self.notify(FeedEvent::Changed);
    }

    /// Apply a realtime deletion and wake consumers.
    pub(crate) fn apply_deleted(&self, id: &AnnotationId) {
        self.store.lock().remove_realtime_item(id);
        self.notify(FeedEvent::Changed);
    }

    /// Fan a notification out to every watcher, dropping the ones whose
    /// buffer is full.
    fn notify(&self, event: FeedEvent) {
        let mut overflowed = Vec::new();
        {
            let watchers = self.watchers.lock();
            for (id, sender) in watchers.iter() {
                if sender.try_send(event.clone()).is_err() {
                    overflowed.push(*id);
                }
            }
        }

        if overflowed.is_empty() {
            return;
        }
        let mut watchers = self.watchers.lock();
        for id in overflowed {
            if let Some(sender) = watchers.remove(&id) {
                debug!(page = %self.page_id, watcher = id.0, "dropping slow feed watcher");
                // Best effort; the buffer that overflowed is likely still full.
                let _ = sender.try_send(FeedEvent::Dropped {
                    reason: DropReason::BufferOverflow,
                });
            }
        }
    }
}
