//! # Page Feed
//!
//! Client-side data layer for collaborative page review: reconciling,
//! realtime feeds of per-page annotations (comments and issues).
//!
//! ## Core Concepts
//!
//! - **Annotations**: immutable comment/issue records attached to a page
//! - **Reconciling store**: merges the one-shot historical batch with the
//!   realtime create/delete stream into a deduplicated, time-ordered
//!   snapshot, independent of which source resolves first
//! - **Registry**: one shared store per page per process, kept for the
//!   whole application session
//! - **Feeds**: consumer subscriptions with pull snapshots and push change
//!   notifications
//!
//! ## Example
//!
//! ```ignore
//! use pagefeed::{Channel, CommentFeeds, FeedConfig, MemoryBackend, PageId, StoreRegistry};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let comments = CommentFeeds::new(
//!     backend,
//!     StoreRegistry::new(),
//!     FeedConfig::new(Channel::new("dev", "page_comments")),
//! );
//!
//! let handle = comments.subscribe(&PageId::from("page-1"));
//! while let Ok(event) = handle.recv() {
//!     println!("{event:?}: {} comments", handle.snapshot().len());
//! }
//! ```

pub mod backend;
pub mod error;
pub mod events;
pub mod feeds;
pub mod reconcile;
pub mod registry;
pub mod types;

// Re-exports
pub use backend::{Backend, MemoryBackend, RealtimeEvent, RealtimeHandler, Unsubscribe};
pub use error::{Result, StoreError};
pub use events::{normalize, AnnotationEvent, Channel};
pub use feeds::{
    CommentFeeds, DropReason, FeedConfig, FeedEvent, FeedHandle, FeedManager, IssueFeeds,
    PageFeed, WatcherId,
};
pub use reconcile::{PageStore, Snapshot};
pub use registry::StoreRegistry;
pub use types::{AnnotationId, AnnotationRecord, Comment, Issue, PageId, Timestamp, UserId};
