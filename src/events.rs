//! Normalization of raw realtime notifications into domain events.
//!
//! The backend pushes opaque change notifications tagged with event strings
//! like `databases.<db>.collections.<coll>.documents.*.create`. The
//! normalizer validates the payload against the expected annotation shape
//! and classifies the notification for one subscribing page. Malformed
//! payloads are discarded (logged) and never reach a store.

use crate::backend::RealtimeEvent;
use crate::types::{AnnotationRecord, PageId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Realtime channel of one document collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub database_id: String,
    pub collection_id: String,
}

impl Channel {
    pub fn new(database_id: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Channel {
            database_id: database_id.into(),
            collection_id: collection_id.into(),
        }
    }

    /// Topic name of the collection's document stream.
    pub fn name(&self) -> String {
        format!(
            "databases.{}.collections.{}.documents",
            self.database_id, self.collection_id
        )
    }

    /// Event tag the backend attaches to document creations.
    pub fn create_event(&self) -> String {
        format!("{}.*.create", self.name())
    }

    /// Event tag the backend attaches to document deletions.
    pub fn delete_event(&self) -> String {
        format!("{}.*.delete", self.name())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A classified change notification for one page.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationEvent<T> {
    /// A new annotation was created on the subscribing page.
    Created(T),
    /// An existing annotation was deleted (issue resolution).
    Deleted(T),
    /// The notification does not concern the subscribing page.
    Ignored,
}

enum ChangeKind {
    Create,
    Delete,
}

fn classify(channel: &Channel, events: &[String]) -> Option<ChangeKind> {
    let create = channel.create_event();
    if events.iter().any(|tag| *tag == create) {
        return Some(ChangeKind::Create);
    }
    let delete = channel.delete_event();
    if events.iter().any(|tag| *tag == delete) {
        return Some(ChangeKind::Delete);
    }
    None
}

/// Classify one raw notification for `page_id`.
///
/// Pure with respect to store state: the result depends only on the
/// notification, the channel, and the subscribing page.
pub fn normalize<T: AnnotationRecord>(
    channel: &Channel,
    page_id: &PageId,
    event: &RealtimeEvent,
) -> AnnotationEvent<T> {
    let Some(kind) = classify(channel, &event.events) else {
        return AnnotationEvent::Ignored;
    };

    if matches!(kind, ChangeKind::Delete) && !T::DELETABLE {
        return AnnotationEvent::Ignored;
    }

    let record = match T::from_document(&event.payload) {
        Ok(record) => record,
        Err(err) => {
            warn!(channel = %channel, error = %err, "discarding malformed realtime payload");
            return AnnotationEvent::Ignored;
        }
    };

    if record.page_id() != page_id {
        return AnnotationEvent::Ignored;
    }

    match kind {
        ChangeKind::Create => AnnotationEvent::Created(record),
        ChangeKind::Delete => AnnotationEvent::Deleted(record),
    }
}
