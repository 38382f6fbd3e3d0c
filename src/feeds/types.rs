//! Feed configuration, events, and consumer handles.

use super::feed::PageFeed;
use crate::backend::Unsubscribe;
use crate::events::Channel;
use crate::reconcile::Snapshot;
use crate::types::{AnnotationRecord, PageId};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the feeds of one annotation collection.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Realtime channel of the collection the feeds mirror.
    pub channel: Channel,

    /// Newest-N window fetched as the historical batch.
    /// Default: 50
    pub history_limit: usize,

    /// Max buffered notifications before a consumer is dropped.
    /// Default: 256
    pub buffer_size: usize,
}

impl FeedConfig {
    pub fn new(channel: Channel) -> Self {
        FeedConfig {
            channel,
            history_limit: 50,
            buffer_size: 256,
        }
    }
}

/// Notifications delivered to feed consumers.
///
/// Every variant means "pull a fresh snapshot"; annotation data never
/// travels on the notification channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedEvent {
    /// The page store was touched by a realtime event.
    Changed,

    /// The historical batch was merged; the feed is live.
    Backfilled,

    /// This consumer was dropped.
    Dropped { reason: DropReason },
}

/// Why a consumer was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Notification buffer overflowed (slow consumer).
    BufferOverflow,
    /// The handle was released.
    Unsubscribed,
}

/// Identifier of one attached consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(pub u64);

/// A consumer's live view of one page's annotations.
///
/// Holds the realtime subscription open; dropping the handle detaches the
/// consumer and synchronously releases the realtime channel. The page store
/// itself stays registered for fast re-subscription.
pub struct FeedHandle<T: AnnotationRecord> {
    pub(super) feed: Arc<PageFeed<T>>,
    pub(super) watcher: WatcherId,
    pub(super) receiver: crossbeam_channel::Receiver<FeedEvent>,
    pub(super) _realtime: Unsubscribe,
}

impl<T: AnnotationRecord> FeedHandle<T> {
    pub fn page_id(&self) -> &PageId {
        self.feed.page_id()
    }

    /// Current snapshot. Returns the same identity as the previous call
    /// unless the store mutated in between; compare with
    /// [`Snapshot::ptr_eq`].
    pub fn snapshot(&self) -> Snapshot<T> {
        self.feed.snapshot()
    }

    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<FeedEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<FeedEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<FeedEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl<T: AnnotationRecord> Drop for FeedHandle<T> {
    fn drop(&mut self) {
        self.feed.detach(self.watcher);
    }
}
