//! End-to-end feed behavior against the in-memory backend.
//!
//! These tests cover:
//! 1. Historical backfill, ascending order, page scoping
//! 2. Realtime creations echoing into live snapshots
//! 3. One shared store per page across consumers
//! 4. Issue resolution (realtime deletes)
//! 5. Delete events on the comment channel being ignored
//! 6. Unsubscription releasing the realtime channel
//! 7. Historical fetch failure leaving the last good state visible
//! 8. The event-before-backfill race
//! 9. A fetch resolving after unsubscription
//! 10. Slow consumers being dropped instead of blocking the feed

use pagefeed::{
    Backend, Channel, CommentFeeds, FeedConfig, FeedEvent, IssueFeeds, MemoryBackend, PageId,
    RealtimeHandler, StoreRegistry, Unsubscribe,
};
use serde_json::{json, Value};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn comments_channel() -> Channel {
    Channel::new("dev", "page_comments")
}

fn issues_channel() -> Channel {
    Channel::new("dev", "page_issues")
}

fn comment_doc(id: &str, page_id: &str, ts: &str) -> Value {
    json!({
        "$id": id,
        "pageId": page_id,
        "comment": format!("comment {id}"),
        "$createdAt": ts,
        "createdBy": "u1",
        "createdByEmail": "reviewer@example.com",
    })
}

fn issue_doc(id: &str, page_id: &str, ts: &str) -> Value {
    json!({
        "$id": id,
        "pageId": page_id,
        "issue": format!("issue {id}"),
        "$createdAt": ts,
        "createdBy": "u1",
        "createdByEmail": "qa@example.com",
    })
}

fn comment_feeds(backend: Arc<dyn Backend>) -> CommentFeeds {
    CommentFeeds::new(
        backend,
        StoreRegistry::new(),
        FeedConfig::new(comments_channel()),
    )
}

const WAIT: Duration = Duration::from_secs(2);
const SETTLE: Duration = Duration::from_millis(200);

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_backfill_orders_ascending_and_scopes_to_page() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_document(&comments_channel(), comment_doc("b", "p1", "2024-01-01T00:00:01Z"));
    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));
    backend.insert_document(&comments_channel(), comment_doc("c", "p1", "2024-01-01T00:00:02Z"));
    backend.insert_document(&comments_channel(), comment_doc("x", "p2", "2024-01-01T00:00:03Z"));

    let feeds = comment_feeds(backend);
    let handle = feeds.subscribe(&PageId::from("p1"));

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));
    let ids: Vec<_> = handle.snapshot().iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn test_realtime_create_reaches_live_snapshot() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let feeds = comment_feeds(backend.clone());
    let handle = feeds.subscribe(&PageId::from("p1"));

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));
    let empty = handle.snapshot();

    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Changed));
    let live = handle.snapshot();
    assert!(!live.ptr_eq(&empty));
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].body, "comment a");
}

#[test]
fn test_consumers_share_one_store_per_page() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let feeds = comment_feeds(backend.clone());

    let first = feeds.subscribe(&PageId::from("p1"));
    assert_eq!(first.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));

    // Second activation reuses the cached store; no second backfill.
    let second = feeds.subscribe(&PageId::from("p1"));
    assert!(second.snapshot().ptr_eq(&first.snapshot()));

    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    wait_until("both consumers notified", || {
        first.snapshot().len() == 1 && second.snapshot().len() == 1
    });
    assert!(first.snapshot().ptr_eq(&second.snapshot()));
    assert_eq!(feeds.registry().len(), 1);
}

#[test]
fn test_issue_resolution_removes_from_snapshot() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_document(&issues_channel(), issue_doc("i1", "p1", "2024-01-01T00:00:00Z"));
    backend.insert_document(&issues_channel(), issue_doc("i2", "p1", "2024-01-01T00:00:01Z"));

    let feeds = IssueFeeds::new(
        backend.clone(),
        StoreRegistry::new(),
        FeedConfig::new(issues_channel()),
    );
    let handle = feeds.subscribe(&PageId::from("p1"));

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));
    assert_eq!(handle.snapshot().len(), 2);

    backend.delete_document(&issues_channel(), "i1");

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Changed));
    let ids: Vec<_> = handle.snapshot().iter().map(|i| i.id.to_string()).collect();
    assert_eq!(ids, ["i2"]);
}

#[test]
fn test_comment_deletes_are_ignored() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    let feeds = comment_feeds(backend.clone());
    let handle = feeds.subscribe(&PageId::from("p1"));

    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));
    let before = handle.snapshot();

    backend.delete_document(&comments_channel(), "a");

    assert!(handle.recv_timeout(SETTLE).is_err());
    assert!(handle.snapshot().ptr_eq(&before));
}

#[test]
fn test_drop_releases_realtime_subscription() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let feeds = comment_feeds(backend.clone());

    let handle = feeds.subscribe(&PageId::from("p1"));
    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));
    assert_eq!(backend.subscriber_count(&comments_channel()), 1);

    drop(handle);
    assert_eq!(backend.subscriber_count(&comments_channel()), 0);

    // Events after release no longer reach the cached store.
    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));
    std::thread::sleep(SETTLE);
    assert_eq!(feeds.snapshot(&PageId::from("p1")).len(), 0);
}

#[test]
fn test_fetch_failure_keeps_feed_alive() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_fetches(true);

    let feeds = comment_feeds(backend.clone());
    let handle = feeds.subscribe(&PageId::from("p1"));

    // The failure is swallowed; no backfill notification arrives.
    assert!(handle.recv_timeout(SETTLE).is_err());
    assert_eq!(handle.snapshot().len(), 0);

    // The realtime side keeps working.
    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));
    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Changed));
    assert_eq!(handle.snapshot().len(), 1);
}

/// Wraps [`MemoryBackend`] and holds every historical fetch until the test
/// releases it, making the event-before-backfill race deterministic.
struct GatedBackend {
    inner: MemoryBackend,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedBackend {
    fn new(inner: MemoryBackend) -> (Arc<Self>, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let backend = Arc::new(GatedBackend {
            inner,
            gate: Mutex::new(gate),
        });
        (backend, release)
    }
}

impl Backend for GatedBackend {
    fn fetch_page_documents(
        &self,
        channel: &Channel,
        page_id: &PageId,
        limit: usize,
    ) -> pagefeed::Result<Vec<Value>> {
        let _ = self.gate.lock().unwrap().recv();
        self.inner.fetch_page_documents(channel, page_id, limit)
    }

    fn subscribe(&self, channel: &Channel, handler: RealtimeHandler) -> Unsubscribe {
        self.inner.subscribe(channel, handler)
    }
}

#[test]
fn test_realtime_event_before_backfill_resolves() {
    init_tracing();
    let memory = MemoryBackend::new();
    memory.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    let (backend, release) = GatedBackend::new(memory.clone());
    let feeds = comment_feeds(backend);
    let handle = feeds.subscribe(&PageId::from("p1"));

    // The fetch is parked; a realtime creation wins the race.
    memory.insert_document(&comments_channel(), comment_doc("b", "p1", "2024-01-01T00:00:05Z"));
    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Changed));

    release.send(()).unwrap();
    assert_eq!(handle.recv_timeout(WAIT), Ok(FeedEvent::Backfilled));

    let ids: Vec<_> = handle.snapshot().iter().map(|c| c.id.to_string()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[test]
fn test_fetch_resolving_after_unsubscribe_is_tolerated() {
    init_tracing();
    let memory = MemoryBackend::new();
    memory.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    let (backend, release) = GatedBackend::new(memory);
    let feeds = comment_feeds(backend);

    let handle = feeds.subscribe(&PageId::from("p1"));
    drop(handle);

    // The late batch lands in the still-registered store without anyone
    // watching.
    release.send(()).unwrap();
    wait_until("late backfill applied", || {
        feeds.snapshot(&PageId::from("p1")).len() == 1
    });
}

#[test]
fn test_slow_consumer_is_dropped_not_blocking() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_document(&comments_channel(), comment_doc("a", "p1", "2024-01-01T00:00:00Z"));

    let mut config = FeedConfig::new(comments_channel());
    config.buffer_size = 1;
    let feeds = CommentFeeds::new(backend.clone(), StoreRegistry::new(), config);

    let handle = feeds.subscribe(&PageId::from("p1"));
    wait_until("backfill applied", || {
        feeds.snapshot(&PageId::from("p1")).len() == 1
    });

    // The undrained buffer holds the backfill notice; further activity
    // overflows it and the watcher is detached.
    backend.insert_document(&comments_channel(), comment_doc("b", "p1", "2024-01-01T00:00:01Z"));
    backend.insert_document(&comments_channel(), comment_doc("c", "p1", "2024-01-01T00:00:02Z"));

    let feed = feeds.registry().get(&PageId::from("p1")).unwrap();
    assert_eq!(feed.watcher_count(), 0);

    // The store itself kept every event.
    assert_eq!(feeds.snapshot(&PageId::from("p1")).len(), 3);

    // The consumer drains whatever was buffered, then the channel ends.
    assert!(handle.recv_timeout(WAIT).is_ok());
    while handle.recv_timeout(SETTLE).is_ok() {}
    assert!(handle.try_recv().is_err());
}
