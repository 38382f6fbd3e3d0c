//! In-memory backend for tests and examples.

use super::{Backend, RealtimeEvent, RealtimeHandler, Unsubscribe};
use crate::error::{Result, StoreError};
use crate::events::Channel;
use crate::types::PageId;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

type SharedHandler = Arc<dyn Fn(RealtimeEvent) + Send + Sync>;

struct Inner {
    /// Documents per collection id, in insertion order.
    documents: Mutex<HashMap<String, Vec<Value>>>,
    /// Realtime handlers per channel name.
    subscribers: Mutex<HashMap<String, HashMap<u64, SharedHandler>>>,
    next_subscriber: AtomicU64,
    fail_fetches: AtomicBool,
}

/// An in-memory stand-in for the hosted document service.
///
/// Holds documents per collection and notifies realtime subscribers
/// synchronously from the mutating call, with the same event tags the real
/// service attaches (the document-specific tag plus the `*` wildcard).
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            inner: Arc::new(Inner {
                documents: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
                fail_fetches: AtomicBool::new(false),
            }),
        }
    }

    /// Make subsequent historical fetches fail.
    pub fn fail_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Number of live realtime subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.inner
            .subscribers
            .lock()
            .get(&channel.name())
            .map_or(0, |handlers| handlers.len())
    }

    /// Insert a document and broadcast the matching create event.
    pub fn insert_document(&self, channel: &Channel, doc: Value) {
        self.inner
            .documents
            .lock()
            .entry(channel.collection_id.clone())
            .or_default()
            .push(doc.clone());
        self.emit(channel, "create", doc);
    }

    /// Delete a document by id and broadcast the matching delete event.
    pub fn delete_document(&self, channel: &Channel, id: &str) {
        let removed = {
            let mut documents = self.inner.documents.lock();
            documents.get_mut(&channel.collection_id).and_then(|docs| {
                docs.iter()
                    .position(|doc| doc_id(doc) == Some(id))
                    .map(|index| docs.remove(index))
            })
        };
        if let Some(doc) = removed {
            self.emit(channel, "delete", doc);
        }
    }

    fn emit(&self, channel: &Channel, action: &str, payload: Value) {
        let name = channel.name();
        let doc = doc_id(&payload).unwrap_or("unknown").to_string();
        let events = vec![
            format!("{name}.{doc}.{action}"),
            format!("{name}.*.{action}"),
        ];

        // Invoke handlers outside the subscriber lock so a handler can
        // re-enter the backend.
        let handlers: Vec<SharedHandler> = self
            .inner
            .subscribers
            .lock()
            .get(&name)
            .map(|handlers| handlers.values().cloned().collect())
            .unwrap_or_default();

        let event = RealtimeEvent { events, payload };
        for handler in handlers {
            handler(event.clone());
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn fetch_page_documents(
        &self,
        channel: &Channel,
        page_id: &PageId,
        limit: usize,
    ) -> Result<Vec<Value>> {
        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated fetch failure".to_string()));
        }

        let documents = self.inner.documents.lock();
        let mut matching: Vec<Value> = documents
            .get(&channel.collection_id)
            .into_iter()
            .flatten()
            .filter(|doc| {
                doc.get("pageId").and_then(Value::as_str) == Some(page_id.as_str())
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| doc_created_at(b).cmp(doc_created_at(a)));
        matching.truncate(limit);
        Ok(matching)
    }

    fn subscribe(&self, channel: &Channel, handler: RealtimeHandler) -> Unsubscribe {
        let name = channel.name();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.inner
            .subscribers
            .lock()
            .entry(name.clone())
            .or_default()
            .insert(id, Arc::from(handler));

        let inner = Arc::clone(&self.inner);
        Unsubscribe::new(move || {
            if let Some(handlers) = inner.subscribers.lock().get_mut(&name) {
                handlers.remove(&id);
            }
        })
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("$id").and_then(Value::as_str)
}

fn doc_created_at(doc: &Value) -> &str {
    doc.get("$createdAt").and_then(Value::as_str).unwrap_or("")
}
