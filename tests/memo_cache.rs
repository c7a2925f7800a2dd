//! At-most-once computation and reset semantics of the memoized cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use archivist::cache::{MemoError, MemoizedCache};

#[test]
fn concurrent_first_access_computes_once() {
    const CALLERS: usize = 16;

    let cache = MemoizedCache::new("blog");
    let calls = AtomicUsize::new(0);
    let barrier = Barrier::new(CALLERS);

    let values: Vec<Arc<Vec<String>>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_compute("tag_cloud", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            vec!["go".to_string(), "rust".to_string()]
                        })
                        .expect("same type")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("caller thread"))
            .collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|value| Arc::ptr_eq(value, &values[0])));
}

#[test]
fn reset_forces_the_next_computation() {
    let cache = MemoizedCache::new("blog");

    let first = cache
        .get_or_compute("categories", || "f1".to_string())
        .expect("same type");
    assert_eq!(first.as_str(), "f1");

    assert!(cache.reset("categories"));
    let second = cache
        .get_or_compute("categories", || "f2".to_string())
        .expect("same type");
    assert_eq!(second.as_str(), "f2");
    assert_eq!(first.as_str(), "f1");
}

#[test]
fn reset_all_clears_every_key() {
    let cache = MemoizedCache::new("blog");
    cache.get_or_compute("a", || 1_u32).expect("same type");
    cache.get_or_compute("b", || 2_u32).expect("same type");
    assert_eq!(cache.len(), 2);

    cache.reset_all();
    assert!(cache.is_empty());
    assert!(!cache.contains("a"));
}

#[derive(Debug, PartialEq)]
enum FeedError {
    Memo,
    Unavailable,
}

impl From<MemoError> for FeedError {
    fn from(_: MemoError) -> Self {
        FeedError::Memo
    }
}

#[test]
fn failed_computations_are_retried() {
    let cache = MemoizedCache::new("blog");
    let attempts = AtomicUsize::new(0);

    let failed: Result<Arc<String>, FeedError> = cache.try_get_or_compute("feed", || {
        attempts.fetch_add(1, Ordering::SeqCst);
        Err(FeedError::Unavailable)
    });
    assert_eq!(failed.unwrap_err(), FeedError::Unavailable);
    assert!(!cache.contains("feed"));

    let value: Arc<String> = cache
        .try_get_or_compute::<_, FeedError, _>("feed", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok("<rss/>".to_string())
        })
        .expect("second attempt succeeds");
    assert_eq!(value.as_str(), "<rss/>");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn mismatched_types_are_reported() {
    let cache = MemoizedCache::new("blog");
    cache.get_or_compute("count", || 3_usize).expect("same type");

    let err = cache
        .get_or_compute("count", || "three".to_string())
        .expect_err("type mismatch");
    assert!(matches!(err, MemoError::TypeMismatch { .. }));
}
