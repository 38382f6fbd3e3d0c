//! Core types for page annotations.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a reviewed page.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        PageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        PageId(id.to_string())
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        PageId(id)
    }
}

/// Backend-assigned identifier of a single annotation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        AnnotationId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        AnnotationId(id.to_string())
    }
}

/// Identifier of the user that authored an annotation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creation timestamp as issued by the backend.
///
/// The backend emits ISO-8601 strings with a fixed UTC offset, which order
/// chronologically under plain byte comparison, so `Ord` is the derived
/// lexicographic ordering of the raw string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(ts: impl Into<String>) -> Self {
        Timestamp(ts.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Timestamp {
    fn from(ts: &str) -> Self {
        Timestamp(ts.to_string())
    }
}

/// A page-scoped annotation record.
///
/// Implemented by [`Comment`] and [`Issue`]; binds a concrete backend
/// document shape to the generic reconciling store.
pub trait AnnotationRecord: Clone + Send + Sync + 'static {
    /// Whether the realtime channel emits delete events this record type
    /// honors. Issues are resolvable; comments never delete.
    const DELETABLE: bool;

    fn id(&self) -> &AnnotationId;

    fn page_id(&self) -> &PageId;

    fn created_at(&self) -> &Timestamp;

    /// Parse a raw backend document.
    ///
    /// Fails when the document does not match the expected shape.
    fn from_document(doc: &serde_json::Value) -> Result<Self>;
}

/// A review comment attached to a page. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: AnnotationId,
    pub page_id: PageId,
    pub body: String,
    pub created_at: Timestamp,
    pub created_by: UserId,
    pub created_by_email: String,
}

/// Wire shape of a comment document as the backend stores it.
#[derive(Deserialize)]
struct CommentDoc {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "pageId")]
    page_id: String,
    comment: String,
    #[serde(rename = "$createdAt")]
    created_at: String,
    #[serde(rename = "createdBy")]
    created_by: String,
    #[serde(rename = "createdByEmail")]
    created_by_email: String,
}

impl AnnotationRecord for Comment {
    const DELETABLE: bool = false;

    fn id(&self) -> &AnnotationId {
        &self.id
    }

    fn page_id(&self) -> &PageId {
        &self.page_id
    }

    fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    fn from_document(doc: &serde_json::Value) -> Result<Self> {
        let doc = CommentDoc::deserialize(doc)?;
        Ok(Comment {
            id: AnnotationId::new(doc.id),
            page_id: PageId::new(doc.page_id),
            body: doc.comment,
            created_at: Timestamp::new(doc.created_at),
            created_by: UserId::new(doc.created_by),
            created_by_email: doc.created_by_email,
        })
    }
}

/// A reported issue attached to a page. Immutable once created; deleted
/// when a reviewer resolves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: AnnotationId,
    pub page_id: PageId,
    pub body: String,
    pub created_at: Timestamp,
    pub created_by: UserId,
    pub created_by_email: String,
}

/// Wire shape of an issue document as the backend stores it.
#[derive(Deserialize)]
struct IssueDoc {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "pageId")]
    page_id: String,
    issue: String,
    #[serde(rename = "$createdAt")]
    created_at: String,
    #[serde(rename = "createdBy")]
    created_by: String,
    #[serde(rename = "createdByEmail")]
    created_by_email: String,
}

impl AnnotationRecord for Issue {
    const DELETABLE: bool = true;

    fn id(&self) -> &AnnotationId {
        &self.id
    }

    fn page_id(&self) -> &PageId {
        &self.page_id
    }

    fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    fn from_document(doc: &serde_json::Value) -> Result<Self> {
        let doc = IssueDoc::deserialize(doc)?;
        Ok(Issue {
            id: AnnotationId::new(doc.id),
            page_id: PageId::new(doc.page_id),
            body: doc.issue,
            created_at: Timestamp::new(doc.created_at),
            created_by: UserId::new(doc.created_by),
            created_by_email: doc.created_by_email,
        })
    }
}
