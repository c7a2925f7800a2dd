use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::repos::{CanonicalStore, RepoError, SearchError, SearchIndex};
use crate::index::Indexes;

use super::listeners::{ListenerError, ListenerSet};
use super::{EntryEvent, ResponseEvent};

const METRIC_INDEX_EVENTS: &str = "archivist_index_events_total";
const METRIC_LISTENER_FAILURES: &str = "archivist_listener_failures_total";
const METRIC_REINDEX_MS: &str = "archivist_reindex_ms";

/// Where a bulk rebuild stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexStage {
    ClearSearch,
    LoadEntries,
    LoadResponses,
    IndexSearch,
    LoadStaticPages,
    IndexStaticPages,
}

impl fmt::Display for ReindexStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReindexStage::ClearSearch => "clearing the search index",
            ReindexStage::LoadEntries => "loading entries",
            ReindexStage::LoadResponses => "loading responses",
            ReindexStage::IndexSearch => "indexing entries for search",
            ReindexStage::LoadStaticPages => "loading static pages",
            ReindexStage::IndexStaticPages => "indexing static pages for search",
        };
        f.write_str(label)
    }
}

/// A failed bulk rebuild. Indexes are left cleared or partially rebuilt;
/// the only recovery is running the reindex again.
#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("reindex of `{collection}` failed while {stage}: {source}")]
    Store {
        collection: String,
        stage: ReindexStage,
        #[source]
        source: RepoError,
    },
    #[error("reindex of `{collection}` failed while {stage}: {source}")]
    Search {
        collection: String,
        stage: ReindexStage,
        #[source]
        source: SearchError,
    },
}

impl ReindexError {
    pub fn stage(&self) -> ReindexStage {
        match self {
            ReindexError::Store { stage, .. } | ReindexError::Search { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexSummary {
    pub entries: usize,
    pub published: usize,
    pub responses: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug)]
pub struct ListenerFailure {
    pub listener: String,
    pub error: ListenerError,
}

/// Outcome of handing one event to every listener.
///
/// Failures are already logged; the event itself counts as applied.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<ListenerFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_listeners(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.listener.as_str())
            .collect()
    }
}

/// Applies lifecycle events to every listener and rebuilds indexes from the store.
pub struct IndexCoordinator {
    collection: String,
    indexes: Indexes,
    search: Arc<dyn SearchIndex>,
    store: Arc<dyn CanonicalStore>,
    listeners: ListenerSet,
}

impl IndexCoordinator {
    pub fn new(
        collection: impl Into<String>,
        indexes: Indexes,
        search: Arc<dyn SearchIndex>,
        store: Arc<dyn CanonicalStore>,
        listeners: ListenerSet,
    ) -> Self {
        Self {
            collection: collection.into(),
            indexes,
            search,
            store,
            listeners,
        }
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// Run every entry listener, in order, isolating each from the others'
    /// errors and panics.
    pub async fn dispatch_entry(&self, event: &EntryEvent) -> DispatchReport {
        let kind = event.kind.as_str();
        counter!(METRIC_INDEX_EVENTS, "kind" => kind).increment(1);

        let mut report = DispatchReport::default();
        for listener in self.listeners.entry_listeners() {
            let outcome = AssertUnwindSafe(listener.on_entry_event(event))
                .catch_unwind()
                .await;
            self.record(&mut report, listener.name(), kind, outcome);
        }
        report
    }

    pub async fn dispatch_response(&self, event: &ResponseEvent) -> DispatchReport {
        let kind = event.kind.as_str();
        counter!(METRIC_INDEX_EVENTS, "kind" => kind).increment(1);

        let mut report = DispatchReport::default();
        for listener in self.listeners.response_listeners() {
            let outcome = AssertUnwindSafe(listener.on_response_event(event))
                .catch_unwind()
                .await;
            self.record(&mut report, listener.name(), kind, outcome);
        }
        report
    }

    fn record(
        &self,
        report: &mut DispatchReport,
        listener: &str,
        kind: &'static str,
        outcome: Result<Result<(), ListenerError>, Box<dyn Any + Send>>,
    ) {
        let error = match outcome {
            Ok(Ok(())) => {
                report.delivered += 1;
                return;
            }
            Ok(Err(err)) => err,
            Err(panic) => ListenerError::Panicked {
                listener: listener.to_string(),
                message: panic_message(panic.as_ref()),
            },
        };

        warn!(
            collection = %self.collection,
            listener,
            kind,
            error = %error,
            "Listener failed; continuing with remaining listeners"
        );
        counter!(METRIC_LISTENER_FAILURES, "listener" => listener.to_string()).increment(1);
        report.failures.push(ListenerFailure {
            listener: listener.to_string(),
            error,
        });
    }

    /// Clear every index and the search engine, then rebuild them from the store.
    ///
    /// Static pages are cleared but not reloaded; follow with
    /// [`reindex_static_pages`](Self::reindex_static_pages). Not retried on failure.
    pub async fn reindex(&self) -> Result<ReindexSummary, ReindexError> {
        let started = Instant::now();
        let result = self.rebuild_entries().await;
        let elapsed_ms = started.elapsed().as_millis();
        histogram!(METRIC_REINDEX_MS, "target" => "entries")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok((entries, published, responses)) => {
                info!(
                    collection = %self.collection,
                    entries,
                    published,
                    responses,
                    elapsed_ms,
                    "Reindex complete"
                );
                Ok(ReindexSummary {
                    entries,
                    published,
                    responses,
                    elapsed_ms,
                })
            }
            Err(err) => {
                error!(
                    collection = %self.collection,
                    stage = %err.stage(),
                    error = %err,
                    elapsed_ms,
                    "Reindex failed; indexes are incomplete until a reindex succeeds"
                );
                Err(err)
            }
        }
    }

    async fn rebuild_entries(&self) -> Result<(usize, usize, usize), ReindexError> {
        for index in self.indexes.entry_indexes() {
            index.clear();
        }
        self.indexes.responses.clear();
        // Clearing the engine drops its static pages too.
        self.indexes.pages.clear();
        self.search
            .clear()
            .await
            .map_err(|source| self.search_error(ReindexStage::ClearSearch, source))?;

        let entries = self
            .store
            .load_all_entries(&self.collection)
            .await
            .map_err(|source| self.store_error(ReindexStage::LoadEntries, source))?;
        let responses = self
            .store
            .load_all_responses(&self.collection)
            .await
            .map_err(|source| self.store_error(ReindexStage::LoadResponses, source))?;

        for index in self.indexes.entry_indexes() {
            index.index(&entries);
        }
        self.indexes.responses.index(&responses);
        self.search
            .index_entries(&entries)
            .await
            .map_err(|source| self.search_error(ReindexStage::IndexSearch, source))?;

        Ok((
            self.indexes.entries.number_of_entries(),
            self.indexes.entries.number_of_published_entries(),
            responses.len(),
        ))
    }

    /// Rebuild the static page index and feed the pages to the search engine.
    pub async fn reindex_static_pages(&self) -> Result<usize, ReindexError> {
        let started = Instant::now();
        self.indexes.pages.clear();

        let result = async {
            let pages = self
                .store
                .load_static_pages(&self.collection)
                .await
                .map_err(|source| self.store_error(ReindexStage::LoadStaticPages, source))?;
            self.indexes.pages.index(&pages);
            self.search
                .index_static_pages(&pages)
                .await
                .map_err(|source| self.search_error(ReindexStage::IndexStaticPages, source))?;
            Ok::<_, ReindexError>(pages.len())
        }
        .await;

        histogram!(METRIC_REINDEX_MS, "target" => "static_pages")
            .record(started.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(pages) => info!(collection = %self.collection, pages, "Static pages reindexed"),
            Err(err) => error!(
                collection = %self.collection,
                stage = %err.stage(),
                error = %err,
                "Static page reindex failed"
            ),
        }
        result
    }

    fn store_error(&self, stage: ReindexStage, source: RepoError) -> ReindexError {
        ReindexError::Store {
            collection: self.collection.clone(),
            stage,
            source,
        }
    }

    fn search_error(&self, stage: ReindexStage, source: SearchError) -> ReindexError {
        ReindexError::Search {
            collection: self.collection.clone(),
            stage,
            source,
        }
    }
}

impl fmt::Debug for IndexCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexCoordinator")
            .field("collection", &self.collection)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::date::SimpleDate;
    use crate::domain::entities::{Entry, StaticPage};
    use crate::domain::types::EntryState;
    use crate::events::listeners::EntryListener;
    use crate::events::{EntryEventKind, EntryEvent};
    use crate::infra::search::MemorySearchIndex;
    use crate::infra::store::MemoryStore;

    struct Exploding;

    #[async_trait]
    impl EntryListener for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        async fn on_entry_event(&self, _event: &EntryEvent) -> Result<(), ListenerError> {
            panic!("listener blew up");
        }
    }

    struct Refusing;

    #[async_trait]
    impl EntryListener for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn on_entry_event(&self, _event: &EntryEvent) -> Result<(), ListenerError> {
            Err(ListenerError::failed("refusing", "not today"))
        }
    }

    fn coordinator(plugins: ListenerSet) -> (IndexCoordinator, Indexes, Arc<MemoryStore>) {
        let clock = Arc::new(FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date")));
        let indexes = Indexes::new(clock);
        let search: Arc<dyn SearchIndex> = Arc::new(MemorySearchIndex::new());
        let store = Arc::new(MemoryStore::new());
        let listeners = plugins.then(ListenerSet::builtin(&indexes, Arc::clone(&search)));
        let coordinator = IndexCoordinator::new(
            "blog",
            indexes.clone(),
            search,
            Arc::clone(&store) as Arc<dyn CanonicalStore>,
            listeners,
        );
        (coordinator, indexes, store)
    }

    fn entry() -> Entry {
        Entry {
            id: "e1".to_string(),
            title: "Gophers".to_string(),
            body: "all about go".to_string(),
            author: "alice".to_string(),
            category: Some("/tech".to_string()),
            tags: BTreeSet::from(["go".to_string()]),
            state: EntryState::Published,
            date: datetime!(2023-06-15 10:00 UTC),
        }
    }

    #[tokio::test]
    async fn failing_plugins_do_not_block_builtin_listeners() {
        let plugins = ListenerSet::new()
            .with_entry(Arc::new(Exploding))
            .with_entry(Arc::new(Refusing));
        let (coordinator, indexes, _) = coordinator(plugins);

        let event = EntryEvent::new("blog", EntryEventKind::Created(entry()), 1);
        let report = coordinator.dispatch_entry(&event).await;

        assert_eq!(report.failed_listeners(), vec!["exploding", "refusing"]);
        assert!(matches!(
            report.failures[0].error,
            ListenerError::Panicked { .. }
        ));
        assert_eq!(indexes.entries.published(), vec!["e1"]);
        assert_eq!(indexes.tags.entries("go"), vec!["e1"]);
        assert_eq!(indexes.categories.entries("/tech"), vec!["e1"]);
        assert_eq!(indexes.authors.entries("alice"), vec!["e1"]);
    }

    #[tokio::test]
    async fn reindex_rebuilds_from_the_store() {
        let (coordinator, indexes, store) = coordinator(ListenerSet::new());
        store.put_entry("blog", entry());

        let summary = coordinator.reindex().await.expect("reindex succeeds");
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.published, 1);
        assert_eq!(indexes.tags.entries("go"), vec!["e1"]);
    }

    #[tokio::test]
    async fn reindex_failure_leaves_indexes_cleared_until_the_next_reindex() {
        let (coordinator, indexes, store) = coordinator(ListenerSet::new());
        store.put_entry("blog", entry());
        coordinator.reindex().await.expect("reindex succeeds");
        assert_eq!(indexes.tags.entries("go"), vec!["e1"]);

        store.fail_loads(true);
        let err = coordinator.reindex().await.expect_err("store is down");
        assert_eq!(err.stage(), ReindexStage::LoadEntries);
        assert!(indexes.entries.entries().is_empty());
        assert!(indexes.tags.entries("go").is_empty());
        assert!(indexes.categories.entries("/tech").is_empty());
        assert!(indexes.authors.entries("alice").is_empty());
        assert_eq!(indexes.entries.archive().number_of_blog_entries(), 0);

        store.fail_loads(false);
        coordinator.reindex().await.expect("store is back");
        assert_eq!(indexes.entries.published(), vec!["e1"]);
        assert_eq!(indexes.tags.entries("go"), vec!["e1"]);
        assert_eq!(indexes.authors.entries("alice"), vec!["e1"]);
    }

    struct OfflineSearch;

    #[async_trait]
    impl SearchIndex for OfflineSearch {
        async fn index_entries(&self, _entries: &[Entry]) -> Result<(), SearchError> {
            Err(SearchError::unavailable("offline"))
        }

        async fn index_static_pages(&self, _pages: &[StaticPage]) -> Result<(), SearchError> {
            Err(SearchError::unavailable("offline"))
        }

        async fn clear(&self) -> Result<(), SearchError> {
            Err(SearchError::unavailable("offline"))
        }

        async fn add_entry(&self, _entry: &Entry) -> Result<(), SearchError> {
            Err(SearchError::unavailable("offline"))
        }

        async fn remove_entry(&self, _id: &str) -> Result<(), SearchError> {
            Err(SearchError::unavailable("offline"))
        }
    }

    #[tokio::test]
    async fn unavailable_search_fails_reindex_at_the_clear_stage() {
        let clock = Arc::new(FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date")));
        let indexes = Indexes::new(clock);
        let store = Arc::new(MemoryStore::new());
        store.put_entry("blog", entry());
        let coordinator = IndexCoordinator::new(
            "blog",
            indexes.clone(),
            Arc::new(OfflineSearch),
            store as Arc<dyn CanonicalStore>,
            ListenerSet::new(),
        );

        let err = coordinator.reindex().await.expect_err("search is offline");
        assert_eq!(err.stage(), ReindexStage::ClearSearch);
        assert!(indexes.entries.entries().is_empty());
    }

    #[tokio::test]
    async fn entry_reindex_clears_pages_with_the_search_engine() {
        let (coordinator, indexes, store) = coordinator(ListenerSet::new());
        store.put_page(
            "blog",
            StaticPage {
                id: "p1".to_string(),
                name: "About".to_string(),
                title: "About".to_string(),
                body: "hello".to_string(),
            },
        );
        coordinator.reindex_static_pages().await.expect("pages load");
        assert_eq!(indexes.pages.page_id("about").as_deref(), Some("p1"));

        coordinator.reindex().await.expect("reindex succeeds");
        assert_eq!(indexes.pages.page_id("about"), None);
    }
}
