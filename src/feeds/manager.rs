//! Wiring between consumers, the registry, and the backend.

use super::feed::PageFeed;
use super::types::{FeedConfig, FeedHandle};
use crate::backend::{Backend, RealtimeEvent, Unsubscribe};
use crate::events::{normalize, AnnotationEvent};
use crate::reconcile::Snapshot;
use crate::registry::StoreRegistry;
use crate::types::{AnnotationRecord, Comment, Issue, PageId};
use std::sync::Arc;
use std::thread;
use tracing::warn;

/// Feeds of page review comments.
pub type CommentFeeds = FeedManager<Comment>;

/// Feeds of page review issues.
pub type IssueFeeds = FeedManager<Issue>;

/// Entry point for consuming one collection's annotation feeds.
///
/// One manager serves one collection (comments or issues). Subscribing to a
/// page attaches the consumer to the page's shared feed, opens a realtime
/// subscription on the collection channel, and on the page's first
/// activation kicks off the one-shot historical backfill.
pub struct FeedManager<T: AnnotationRecord> {
    backend: Arc<dyn Backend>,
    registry: StoreRegistry<T>,
    config: FeedConfig,
    /// Stable empty snapshot served for pages never subscribed to.
    empty: Snapshot<T>,
}

impl<T: AnnotationRecord> FeedManager<T> {
    /// Build a manager over an explicitly constructed registry.
    pub fn new(backend: Arc<dyn Backend>, registry: StoreRegistry<T>, config: FeedConfig) -> Self {
        FeedManager {
            backend,
            registry,
            config,
            empty: Snapshot::from(Vec::new()),
        }
    }

    /// Attach a consumer to `page_id`.
    ///
    /// The realtime subscription opens before the historical fetch is
    /// kicked, so nothing created in between can be missed; the overlap is
    /// deduplicated by the store.
    pub fn subscribe(&self, page_id: &PageId) -> FeedHandle<T> {
        let feed = self.registry.get_or_create(page_id);
        let (watcher, receiver) = feed.attach(self.config.buffer_size);
        let realtime = self.open_realtime(&feed);
        if feed.claim_backfill() {
            self.spawn_backfill(&feed);
        }
        FeedHandle {
            feed,
            watcher,
            receiver,
            _realtime: realtime,
        }
    }

    /// Snapshot for `page_id` without subscribing.
    ///
    /// Pages never subscribed to yield the manager's stable empty snapshot.
    pub fn snapshot(&self, page_id: &PageId) -> Snapshot<T> {
        match self.registry.get(page_id) {
            Some(feed) => feed.snapshot(),
            None => self.empty.clone(),
        }
    }

    /// The registry backing this manager.
    pub fn registry(&self) -> &StoreRegistry<T> {
        &self.registry
    }

    fn open_realtime(&self, feed: &Arc<PageFeed<T>>) -> Unsubscribe {
        let channel = self.config.channel.clone();
        let feed = Arc::clone(feed);
        self.backend.subscribe(
            &self.config.channel,
            Box::new(move |event: RealtimeEvent| {
                match normalize::<T>(&channel, feed.page_id(), &event) {
                    AnnotationEvent::Created(item) => feed.apply_created(item),
                    AnnotationEvent::Deleted(item) => feed.apply_deleted(item.id()),
                    AnnotationEvent::Ignored => {}
                }
            }),
        )
    }

    /// Fire-and-forget historical fetch. Failure is swallowed here: the
    /// store's last good state stays visible and no retry happens at this
    /// layer.
    fn spawn_backfill(&self, feed: &Arc<PageFeed<T>>) {
        let backend = Arc::clone(&self.backend);
        let channel = self.config.channel.clone();
        let limit = self.config.history_limit;
        let page_id = feed.page_id().clone();
        let feed = Arc::clone(feed);

        let spawned = thread::Builder::new()
            .name(format!("backfill-{page_id}"))
            .spawn(move || {
                match backend.fetch_page_documents(&channel, feed.page_id(), limit) {
                    Ok(mut documents) => {
                        // The backend reads newest-first; the store wants
                        // ascending creation order.
                        documents.reverse();
                        let batch: Vec<T> = documents
                            .iter()
                            .filter_map(|doc| match T::from_document(doc) {
                                Ok(item) => Some(item),
                                Err(err) => {
                                    warn!(
                                        page = %feed.page_id(),
                                        error = %err,
                                        "skipping malformed historical document"
                                    );
                                    None
                                }
                            })
                            .collect();
                        feed.apply_backfill(batch);
                    }
                    Err(err) => {
                        warn!(page = %feed.page_id(), error = %err, "historical fetch failed");
                    }
                }
            });
        if let Err(err) = spawned {
            warn!(page = %page_id, error = %err, "failed to spawn backfill thread");
        }
    }
}
