//! Subscription bridge between UI consumers and per-page stores.
//!
//! A [`FeedManager`] serves one annotation collection (comments or issues).
//! Subscribing to a page:
//! - obtains the page's shared [`PageFeed`] from the registry (creating it
//!   on first touch),
//! - opens a realtime subscription on the collection channel, routed
//!   through the normalizer,
//! - on the page's first activation, fires the one-shot historical fetch
//!   whose resolution merges into the store and notifies consumers.
//!
//! Consumers pull snapshots and receive change notifications over a bounded
//! channel; slow consumers are dropped rather than blocking the feed.
//!
//! # Example
//!
//! ```ignore
//! let comments = CommentFeeds::new(backend, StoreRegistry::new(), config);
//! let handle = comments.subscribe(&PageId::from("page-1"));
//!
//! let mut view = handle.snapshot();
//! while let Ok(event) = handle.recv() {
//!     let next = handle.snapshot();
//!     if !next.ptr_eq(&view) {
//!         view = next;
//!         render(&view);
//!     }
//!     if matches!(event, FeedEvent::Dropped { .. }) {
//!         break;
//!     }
//! }
//! ```

mod feed;
mod manager;
mod types;

pub use feed::PageFeed;
pub use manager::{CommentFeeds, FeedManager, IssueFeeds};
pub use types::{DropReason, FeedConfig, FeedEvent, FeedHandle, WatcherId};
