//! The storage/realtime collaborator boundary.
//!
//! The feed layer never talks to the hosted document service directly; it
//! goes through [`Backend`]. Two operations are all the reconciling store
//! needs: a one-shot newest-first historical read and a push-based realtime
//! channel. Annotation writes happen elsewhere in the application and come
//! back through the realtime channel as an echo; this layer never issues
//! writes.

mod memory;

pub use memory::MemoryBackend;

use crate::error::Result;
use crate::events::Channel;
use crate::types::PageId;
use std::fmt;

/// A raw change notification as delivered by the realtime channel.
#[derive(Clone, Debug)]
pub struct RealtimeEvent {
    /// Event tags the backend attached to the notification.
    pub events: Vec<String>,
    /// Opaque document payload.
    pub payload: serde_json::Value,
}

/// Callback invoked for every notification on a subscribed channel.
pub type RealtimeHandler = Box<dyn Fn(RealtimeEvent) + Send + Sync>;

/// Operations the annotation store consumes from the backing service.
pub trait Backend: Send + Sync {
    /// Fetch the newest documents of one page, newest first.
    ///
    /// Callers reverse the batch into ascending creation order before it
    /// reaches a page store.
    fn fetch_page_documents(
        &self,
        channel: &Channel,
        page_id: &PageId,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>>;

    /// Open a realtime subscription on `channel`.
    ///
    /// Dropping the returned guard must synchronously stop further
    /// deliveries to `handler`.
    fn subscribe(&self, channel: &Channel, handler: RealtimeHandler) -> Unsubscribe;
}

/// Guard releasing a realtime subscription on drop.
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send>>);

impl Unsubscribe {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Unsubscribe(Some(Box::new(release)))
    }
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Unsubscribe")
    }
}
