//! Process-wide map from page id to its feed.

use crate::feeds::PageFeed;
use crate::types::{AnnotationRecord, PageId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every per-page feed created during the application session.
///
/// Constructed once at application startup and injected into the feed
/// manager; there is no hidden module-level state. Feeds are created lazily
/// and never evicted, so the map grows with the number of distinct pages
/// viewed. That number stays small for an interactive review session; a
/// long-running process touching an unbounded page set would need an
/// eviction policy this registry deliberately does not have.
pub struct StoreRegistry<T> {
    feeds: RwLock<HashMap<PageId, Arc<PageFeed<T>>>>,
}

impl<T: AnnotationRecord> StoreRegistry<T> {
    pub fn new() -> Self {
        StoreRegistry {
            feeds: RwLock::new(HashMap::new()),
        }
    }

    /// Existing feed for `page_id`, or a freshly registered empty one.
    pub fn get_or_create(&self, page_id: &PageId) -> Arc<PageFeed<T>> {
        if let Some(feed) = self.feeds.read().get(page_id) {
            return Arc::clone(feed);
        }
        let mut feeds = self.feeds.write();
        Arc::clone(
            feeds
                .entry(page_id.clone())
                .or_insert_with(|| Arc::new(PageFeed::new(page_id.clone()))),
        )
    }

    pub fn get(&self, page_id: &PageId) -> Option<Arc<PageFeed<T>>> {
        self.feeds.read().get(page_id).map(Arc::clone)
    }

    /// Number of pages tracked this session.
    pub fn len(&self) -> usize {
        self.feeds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.read().is_empty()
    }
}

impl<T: AnnotationRecord> Default for StoreRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
