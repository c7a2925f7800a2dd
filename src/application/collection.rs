//! The content collection: one blog's indexes, archive and derived values.

use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::repos::{CanonicalStore, SearchIndex};
use crate::archive::Archive;
use crate::cache::MemoizedCache;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::categories::{Category, CategoryTree};
use crate::domain::clock::Clock;
use crate::domain::entities::{Entry, Response};
use crate::domain::error::DomainError;
use crate::events::{
    DispatchReport, EntryEvent, EntryEventKind, IndexCoordinator, ListenerRegistry, ListenerSet,
    PluginContext, ReindexError, ReindexSummary, ResponseEvent, ResponseEventKind,
};
use crate::index::{Indexes, TagCount};
use crate::infra::audit::{AuditListener, AuditTrail, DEFAULT_AUDIT_CAPACITY};
use crate::infra::clock::SystemClock;
use crate::infra::error::InfraError;
use crate::infra::request_log::RequestLog;
use crate::infra::search::MemorySearchIndex;

const SOURCE: &str = "archivist::application::collection";

pub const DEFAULT_RECENT_ENTRIES: usize = 10;

const TAG_CLOUD_KEY: &str = "tag_cloud";
const CATEGORIES_KEY: &str = "categories";
const SERVICE_KEY_PREFIX: &str = "service:";

/// Outcome of a full reindex. Static pages are rebuilt and reported on their own.
#[derive(Debug)]
pub struct ReindexReport {
    pub entries: Result<ReindexSummary, ReindexError>,
    pub static_pages: Result<usize, ReindexError>,
}

impl ReindexReport {
    pub fn is_ok(&self) -> bool {
        self.entries.is_ok() && self.static_pages.is_ok()
    }
}

pub struct ContentCollection {
    id: String,
    clock: Arc<dyn Clock>,
    indexes: Indexes,
    search: Arc<dyn SearchIndex>,
    coordinator: IndexCoordinator,
    memo: MemoizedCache,
    categories: RwLock<Arc<CategoryTree>>,
    audit: Arc<AuditTrail>,
    request_log: Option<RequestLog>,
    recent_entries: usize,
    epoch: AtomicU64,
}

impl ContentCollection {
    pub fn builder(id: impl Into<String>, store: Arc<dyn CanonicalStore>) -> ContentCollectionBuilder {
        ContentCollectionBuilder::new(id, store)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn indexes(&self) -> &Indexes {
        &self.indexes
    }

    pub fn search(&self) -> &Arc<dyn SearchIndex> {
        &self.search
    }

    pub fn coordinator(&self) -> &IndexCoordinator {
        &self.coordinator
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn memo(&self) -> &MemoizedCache {
        &self.memo
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Lifecycle events. Each returns once every listener has run.

    pub async fn entry_created(&self, entry: Entry) -> DispatchReport {
        self.dispatch_entry(EntryEventKind::Created(entry)).await
    }

    pub async fn entry_updated(&self, previous: Entry, current: Entry) -> DispatchReport {
        self.dispatch_entry(EntryEventKind::Updated { previous, current })
            .await
    }

    pub async fn entry_deleted(&self, entry: Entry) -> DispatchReport {
        self.dispatch_entry(EntryEventKind::Deleted(entry)).await
    }

    pub async fn response_created(&self, response: Response) -> DispatchReport {
        self.dispatch_response(ResponseEventKind::Created(response))
            .await
    }

    pub async fn response_moderated(&self, previous: Response, current: Response) -> DispatchReport {
        self.dispatch_response(ResponseEventKind::Moderated { previous, current })
            .await
    }

    pub async fn response_deleted(&self, response: Response) -> DispatchReport {
        self.dispatch_response(ResponseEventKind::Deleted(response))
            .await
    }

    async fn dispatch_entry(&self, kind: EntryEventKind) -> DispatchReport {
        let event = EntryEvent::new(self.id.clone(), kind, self.next_epoch());
        let report = self.coordinator.dispatch_entry(&event).await;
        self.memo.reset(TAG_CLOUD_KEY);
        report
    }

    async fn dispatch_response(&self, kind: ResponseEventKind) -> DispatchReport {
        let event = ResponseEvent::new(self.id.clone(), kind, self.next_epoch());
        self.coordinator.dispatch_response(&event).await
    }

    /// Rebuild every index and the search engine from the canonical store.
    pub async fn reindex(&self) -> ReindexReport {
        let entries = self.coordinator.reindex().await;
        let static_pages = self.coordinator.reindex_static_pages().await;
        self.memo.reset(TAG_CLOUD_KEY);
        ReindexReport {
            entries,
            static_pages,
        }
    }

    /// Rebuild entries and responses. Clearing the search engine drops its
    /// static pages, so they are reloaded too; a page failure is only logged.
    pub async fn reindex_entries(&self) -> Result<ReindexSummary, ReindexError> {
        let result = self.coordinator.reindex().await;
        self.memo.reset(TAG_CLOUD_KEY);
        if let Err(err) = self.coordinator.reindex_static_pages().await {
            warn!(collection = %self.id, error = %err, "Static pages left empty after entry reindex");
        }
        result
    }

    pub async fn reindex_static_pages(&self) -> Result<usize, ReindexError> {
        self.coordinator.reindex_static_pages().await
    }

    // Queries.

    pub fn archive(&self) -> Arc<Archive> {
        self.indexes.entries.archive()
    }

    pub fn recent_entries_limit(&self) -> usize {
        self.recent_entries
    }

    pub fn recent_entries(&self) -> Vec<String> {
        self.indexes.entries.recent(self.recent_entries)
    }

    pub fn recent_published_entries(&self) -> Vec<String> {
        self.indexes.entries.recent_published(self.recent_entries)
    }

    pub fn recent_published_entries_for_tag(&self, tag: &str) -> Vec<String> {
        self.published_only(self.indexes.tags.entries(tag))
    }

    /// Includes entries filed under descendant categories.
    pub fn recent_published_entries_for_category(&self, category: &str) -> Vec<String> {
        self.published_only(self.indexes.categories.entries(category))
    }

    pub fn recent_published_entries_for_author(&self, author: &str) -> Vec<String> {
        self.published_only(self.indexes.authors.entries(author))
    }

    fn published_only(&self, ids: Vec<String>) -> Vec<String> {
        ids.into_iter()
            .filter(|id| self.indexes.entries.is_published(id))
            .take(self.recent_entries)
            .collect()
    }

    pub fn recent_approved_responses(&self) -> Vec<String> {
        self.indexes.responses.recent_approved(self.recent_entries)
    }

    pub fn last_modified(&self) -> Option<OffsetDateTime> {
        self.indexes.entries.last_modified()
    }

    pub fn previous_entry(&self, id: &str) -> Option<String> {
        self.indexes.entries.previous_entry(id)
    }

    pub fn next_entry(&self, id: &str) -> Option<String> {
        self.indexes.entries.next_entry(id)
    }

    pub fn static_page_id(&self, name: &str) -> Option<String> {
        self.indexes.pages.page_id(name)
    }

    /// Tag counts with ranks, recomputed after entry changes.
    pub fn tag_cloud(&self) -> Arc<Vec<TagCount>> {
        self.memoized(TAG_CLOUD_KEY, || self.indexes.tags.cloud())
    }

    // Category hierarchy. Writers are serialized by the tree lock; readers
    // work on an immutable snapshot.

    pub fn category_tree(&self) -> Arc<CategoryTree> {
        Arc::clone(&rw_read(&self.categories, SOURCE, "category_tree"))
    }

    /// Categories in depth-first order from the root.
    pub fn categories(&self) -> Arc<Vec<Category>> {
        self.memoized(CATEGORIES_KEY, || self.category_tree().list())
    }

    pub fn category(&self, id: &str) -> Option<Category> {
        self.category_tree().get(id)
    }

    pub fn add_category(&self, id: &str, name: &str) -> Result<bool, DomainError> {
        let mut guard = rw_write(&self.categories, SOURCE, "add_category");
        let mut tree = CategoryTree::clone(&guard);
        let added = tree.add(id, name)?;
        if added {
            *guard = Arc::new(tree);
            self.memo.reset(CATEGORIES_KEY);
            info!(collection = %self.id, category = id, "Category added");
        }
        Ok(added)
    }

    /// Remove a category with its whole subtree, returning the removed ids.
    pub fn remove_category(&self, id: &str) -> Result<Vec<String>, DomainError> {
        let mut guard = rw_write(&self.categories, SOURCE, "remove_category");
        let mut tree = CategoryTree::clone(&guard);
        let removed = tree.remove(id)?;
        *guard = Arc::new(tree);
        self.memo.reset(CATEGORIES_KEY);
        info!(collection = %self.id, category = id, removed = removed.len(), "Category removed");
        Ok(removed)
    }

    /// Record one request in the collection's request log, if configured.
    pub fn log_request(&self, request_path: &str) -> Result<(), InfraError> {
        match &self.request_log {
            Some(log) => log.append(&self.id, request_path),
            None => Ok(()),
        }
    }

    // Service cache: memoized values owned by collaborators of this collection.

    pub fn service_cache_item<T, F>(&self, key: &str, compute: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> T,
    {
        self.memoized(&service_key(key), compute)
    }

    /// Fallible service cache access; a failed computation is not cached.
    pub fn try_service_cache_item<T, E, F>(&self, key: &str, compute: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        E: From<crate::cache::MemoError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.memo.try_get_or_compute(&service_key(key), compute)
    }

    pub fn reset_service_cache_item(&self, key: &str) -> bool {
        self.memo.reset(&service_key(key))
    }

    fn memoized<T, F>(&self, key: &str, compute: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> T,
    {
        match self.memo.get_or_compute(key, &compute) {
            Ok(value) => value,
            Err(err) => {
                warn!(collection = %self.id, key, error = %err, "Memoized value bypassed");
                Arc::new(compute())
            }
        }
    }
}

fn service_key(key: &str) -> String {
    format!("{SERVICE_KEY_PREFIX}{key}")
}

impl std::fmt::Debug for ContentCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCollection")
            .field("id", &self.id)
            .field("coordinator", &self.coordinator)
            .field("recent_entries", &self.recent_entries)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`ContentCollection`] and its listener set.
pub struct ContentCollectionBuilder {
    id: String,
    store: Arc<dyn CanonicalStore>,
    clock: Option<Arc<dyn Clock>>,
    search: Option<Arc<dyn SearchIndex>>,
    registry: ListenerRegistry,
    entry_plugins: Vec<String>,
    response_plugins: Vec<String>,
    extra_listeners: ListenerSet,
    categories: CategoryTree,
    recent_entries: usize,
    audit_capacity: usize,
    request_log: Option<PathBuf>,
}

impl ContentCollectionBuilder {
    pub fn new(id: impl Into<String>, store: Arc<dyn CanonicalStore>) -> Self {
        Self {
            id: id.into(),
            store,
            clock: None,
            search: None,
            registry: ListenerRegistry::with_builtins(),
            entry_plugins: Vec::new(),
            response_plugins: Vec::new(),
            extra_listeners: ListenerSet::new(),
            categories: CategoryTree::new(),
            recent_entries: DEFAULT_RECENT_ENTRIES,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            request_log: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn registry(mut self, registry: ListenerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Plugin tags to resolve through the registry, in order.
    pub fn entry_plugins(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.entry_plugins = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn response_plugins(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.response_plugins = names.into_iter().map(Into::into).collect();
        self
    }

    /// Listeners supplied directly; they run before the configured plugins.
    pub fn listeners(mut self, listeners: ListenerSet) -> Self {
        self.extra_listeners = listeners;
        self
    }

    pub fn categories(mut self, categories: CategoryTree) -> Self {
        self.categories = categories;
        self
    }

    pub fn recent_entries(mut self, limit: usize) -> Self {
        self.recent_entries = limit;
        self
    }

    pub fn audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity;
        self
    }

    pub fn request_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.request_log = Some(path.into());
        self
    }

    /// Resolve plugins and wire the listener set: plugins first, then the
    /// index, search and audit listeners.
    pub fn build(self) -> Result<ContentCollection, AppError> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::default()));
        let search = self
            .search
            .unwrap_or_else(|| Arc::new(MemorySearchIndex::new()));
        let indexes = Indexes::new(Arc::clone(&clock));

        let context = PluginContext {
            collection: self.id.clone(),
            indexes: indexes.clone(),
            search: Arc::clone(&search),
        };
        let plugins = self
            .registry
            .resolve(&self.entry_plugins, &self.response_plugins, &context)?;

        let audit = Arc::new(AuditTrail::new(self.audit_capacity));
        let audit_listener = Arc::new(AuditListener::new(Arc::clone(&audit)));
        let listeners = self
            .extra_listeners
            .then(plugins)
            .then(ListenerSet::builtin(&indexes, Arc::clone(&search)))
            .with_entry(Arc::clone(&audit_listener) as _)
            .with_response(audit_listener);

        let request_log = self.request_log.map(RequestLog::open).transpose()?;

        let coordinator = IndexCoordinator::new(
            self.id.clone(),
            indexes.clone(),
            Arc::clone(&search),
            self.store,
            listeners,
        );
        info!(
            collection = %self.id,
            listeners = ?coordinator.listeners(),
            "Content collection ready"
        );

        Ok(ContentCollection {
            memo: MemoizedCache::new(self.id.clone()),
            id: self.id,
            clock,
            indexes,
            search,
            coordinator,
            categories: RwLock::new(Arc::new(self.categories)),
            audit,
            request_log,
            recent_entries: self.recent_entries,
            epoch: AtomicU64::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::AtomicUsize;

    use time::macros::datetime;

    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::date::SimpleDate;
    use crate::domain::types::{EntryState, ModerationState, ResponseKind};
    use crate::infra::store::MemoryStore;

    fn collection() -> (ContentCollection, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date")));
        let collection = ContentCollection::builder("blog", Arc::clone(&store) as _)
            .clock(clock)
            .recent_entries(2)
            .build()
            .expect("collection builds");
        (collection, store)
    }

    fn entry(id: &str, hour: u8, tags: &[&str], state: EntryState) -> Entry {
        Entry {
            id: id.to_string(),
            title: format!("Entry {id}"),
            body: String::new(),
            author: "alice".to_string(),
            category: Some("/tech/rust".to_string()),
            tags: tags.iter().map(|tag| tag.to_string()).collect::<BTreeSet<_>>(),
            state,
            date: datetime!(2023-06-15 0:00 UTC) + time::Duration::hours(i64::from(hour)),
        }
    }

    #[tokio::test]
    async fn recent_queries_only_list_published_entries() {
        let (collection, _) = collection();
        collection
            .entry_created(entry("a", 1, &["go"], EntryState::Published))
            .await;
        collection
            .entry_created(entry("b", 2, &["go"], EntryState::Unpublished))
            .await;
        collection
            .entry_created(entry("c", 3, &["go"], EntryState::Published))
            .await;
        collection
            .entry_created(entry("d", 4, &["go"], EntryState::Published))
            .await;

        assert_eq!(collection.recent_entries(), vec!["d", "c"]);
        assert_eq!(collection.recent_published_entries_for_tag("go"), vec!["d", "c"]);
        assert_eq!(
            collection.recent_published_entries_for_category("/tech"),
            vec!["d", "c"]
        );
        assert_eq!(collection.recent_published_entries_for_author("alice").len(), 2);
        assert_eq!(collection.previous_entry("c").as_deref(), Some("a"));
        assert_eq!(collection.next_entry("c").as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn tag_cloud_is_reset_by_entry_events() {
        let (collection, _) = collection();
        collection
            .entry_created(entry("a", 1, &["go"], EntryState::Published))
            .await;
        let first = collection.tag_cloud();
        assert!(Arc::ptr_eq(&first, &collection.tag_cloud()));

        collection
            .entry_created(entry("b", 2, &["rust"], EntryState::Published))
            .await;
        let second = collection.tag_cloud();
        assert_eq!(second.len(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn response_events_reach_the_response_index_and_audit() {
        let (collection, _) = collection();
        collection
            .entry_created(entry("a", 1, &[], EntryState::Published))
            .await;
        let pending = Response {
            id: "r1".to_string(),
            entry_id: "a".to_string(),
            kind: ResponseKind::Comment,
            state: ModerationState::Pending,
            author: "bob".to_string(),
            body: "hi".to_string(),
            date: datetime!(2023-06-16 0:00 UTC),
        };
        collection.response_created(pending.clone()).await;
        let approved = Response {
            state: ModerationState::Approved,
            ..pending.clone()
        };
        let report = collection.response_moderated(pending, approved).await;

        assert!(report.is_clean());
        assert_eq!(collection.recent_approved_responses(), vec!["r1"]);
        assert_eq!(collection.audit().len(), 3);
        let epochs: Vec<_> = collection
            .audit()
            .records()
            .iter()
            .map(|record| record.epoch)
            .collect();
        assert_eq!(epochs, vec![1, 2, 3]);
    }

    #[test]
    fn category_mutations_refresh_the_listing() {
        let (collection, _) = collection();
        assert_eq!(collection.categories().len(), 1);

        assert!(collection.add_category("/tech/rust", "Rust").expect("valid id"));
        let names: Vec<_> = collection
            .categories()
            .iter()
            .map(|category| category.id.clone())
            .collect();
        assert_eq!(names, vec!["/", "/tech", "/tech/rust"]);

        let removed = collection.remove_category("/tech").expect("exists");
        assert_eq!(removed, vec!["/tech", "/tech/rust"]);
        assert_eq!(collection.categories().len(), 1);
        assert!(collection.remove_category("/").is_err());
    }

    #[test]
    fn service_cache_items_compute_once_until_reset() {
        let (collection, _) = collection();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "feed".to_string()
        };

        let first = collection.service_cache_item("rss", compute);
        let second = collection.service_cache_item("rss", compute);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(collection.reset_service_cache_item("rss"));
        let _ = collection.service_cache_item("rss", compute);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug, PartialEq)]
    enum FeedError {
        Cache,
        Unavailable,
    }

    impl From<crate::cache::MemoError> for FeedError {
        fn from(_: crate::cache::MemoError) -> Self {
            FeedError::Cache
        }
    }

    #[test]
    fn failed_service_cache_items_are_retried() {
        let (collection, _) = collection();
        let calls = AtomicUsize::new(0);

        let failed: Result<Arc<String>, FeedError> = collection.try_service_cache_item("rss", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FeedError::Unavailable)
        });
        assert_eq!(failed.unwrap_err(), FeedError::Unavailable);
        assert!(!collection.memo().contains("service:rss"));

        let fresh: Arc<String> = collection
            .try_service_cache_item::<_, FeedError, _>("rss", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("<rss/>".to_string())
            })
            .expect("second attempt succeeds");
        let cached: Arc<String> = collection
            .try_service_cache_item::<_, FeedError, _>("rss", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("stale".to_string())
            })
            .expect("cached value");

        assert_eq!(fresh.as_str(), "<rss/>");
        assert!(Arc::ptr_eq(&fresh, &cached));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entry_reindex_keeps_static_pages_searchable() {
        let search = Arc::new(MemorySearchIndex::new());
        let store = Arc::new(MemoryStore::new());
        let collection = ContentCollection::builder("blog", Arc::clone(&store) as _)
            .clock(Arc::new(FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date"))))
            .search(Arc::clone(&search) as _)
            .build()
            .expect("collection builds");
        store.put_page(
            "blog",
            crate::domain::entities::StaticPage {
                id: "p1".to_string(),
                name: "About".to_string(),
                title: "About".to_string(),
                body: "hello".to_string(),
            },
        );

        assert!(collection.reindex().await.is_ok());
        collection.reindex_entries().await.expect("entries reindex");

        assert_eq!(collection.static_page_id("about").as_deref(), Some("p1"));
        assert_eq!(search.number_of_pages(), 1);
        assert_eq!(search.search_pages("hello"), vec!["p1"]);
    }

    #[tokio::test]
    async fn reindex_reports_static_pages_separately() {
        let (collection, store) = collection();
        store.put_entry("blog", entry("a", 1, &["go"], EntryState::Published));
        store.put_page(
            "blog",
            crate::domain::entities::StaticPage {
                id: "p1".to_string(),
                name: "About".to_string(),
                title: "About".to_string(),
                body: String::new(),
            },
        );

        let report = collection.reindex().await;
        assert!(report.is_ok());
        assert_eq!(report.static_pages.as_ref().ok(), Some(&1));
        assert_eq!(collection.static_page_id("about").as_deref(), Some("p1"));
        assert_eq!(collection.tag_cloud().len(), 1);
    }
}
