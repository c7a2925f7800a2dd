//! Canonical store adapters.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::repos::{CanonicalStore, RepoError};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{Entry, Response, StaticPage};

const SOURCE: &str = "archivist::infra::store";

/// Serialized form of one collection: `[[entries]]`, `[[responses]]`, `[[pages]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreDocument {
    pub entries: Vec<Entry>,
    pub responses: Vec<Response>,
    pub pages: Vec<StaticPage>,
}

impl StoreDocument {
    /// Reject documents with repeated ids or responses to unknown entries.
    pub fn validate(&self) -> Result<(), RepoError> {
        let mut entry_ids = BTreeSet::new();
        for entry in &self.entries {
            if !entry_ids.insert(entry.id.as_str()) {
                return Err(RepoError::invalid_record(format!(
                    "duplicate entry id `{}`",
                    entry.id
                )));
            }
        }

        let mut response_ids = BTreeSet::new();
        for response in &self.responses {
            if !response_ids.insert(response.id.as_str()) {
                return Err(RepoError::invalid_record(format!(
                    "duplicate response id `{}`",
                    response.id
                )));
            }
            if !entry_ids.contains(response.entry_id.as_str()) {
                return Err(RepoError::invalid_record(format!(
                    "response `{}` refers to unknown entry `{}`",
                    response.id, response.entry_id
                )));
            }
        }

        let mut page_ids = BTreeSet::new();
        for page in &self.pages {
            if !page_ids.insert(page.id.as_str()) {
                return Err(RepoError::invalid_record(format!(
                    "duplicate page id `{}`",
                    page.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct CollectionData {
    entries: BTreeMap<String, Entry>,
    responses: BTreeMap<String, Response>,
    pages: BTreeMap<String, StaticPage>,
}

/// Mutable in-memory store, keyed by collection id.
///
/// Deleting an entry also deletes its responses.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, CollectionData>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(collection: &str, document: StoreDocument) -> Self {
        let store = Self::new();
        for entry in document.entries {
            store.put_entry(collection, entry);
        }
        for response in document.responses {
            store.put_response(collection, response);
        }
        for page in document.pages {
            store.put_page(collection, page);
        }
        store
    }

    /// Insert or replace an entry, returning the replaced version.
    pub fn put_entry(&self, collection: &str, entry: Entry) -> Option<Entry> {
        let mut collections = rw_write(&self.collections, SOURCE, "put_entry");
        collections
            .entry(collection.to_string())
            .or_default()
            .entries
            .insert(entry.id.clone(), entry)
    }

    /// Remove an entry and its responses.
    pub fn remove_entry(&self, collection: &str, id: &str) -> Option<(Entry, Vec<Response>)> {
        let mut collections = rw_write(&self.collections, SOURCE, "remove_entry");
        let data = collections.get_mut(collection)?;
        let entry = data.entries.remove(id)?;
        let orphaned: Vec<String> = data
            .responses
            .values()
            .filter(|response| response.entry_id == id)
            .map(|response| response.id.clone())
            .collect();
        let responses = orphaned
            .iter()
            .filter_map(|response_id| data.responses.remove(response_id))
            .collect();
        Some((entry, responses))
    }

    pub fn entry(&self, collection: &str, id: &str) -> Option<Entry> {
        rw_read(&self.collections, SOURCE, "entry")
            .get(collection)?
            .entries
            .get(id)
            .cloned()
    }

    pub fn put_response(&self, collection: &str, response: Response) -> Option<Response> {
        let mut collections = rw_write(&self.collections, SOURCE, "put_response");
        collections
            .entry(collection.to_string())
            .or_default()
            .responses
            .insert(response.id.clone(), response)
    }

    pub fn remove_response(&self, collection: &str, id: &str) -> Option<Response> {
        rw_write(&self.collections, SOURCE, "remove_response")
            .get_mut(collection)?
            .responses
            .remove(id)
    }

    pub fn response(&self, collection: &str, id: &str) -> Option<Response> {
        rw_read(&self.collections, SOURCE, "response")
            .get(collection)?
            .responses
            .get(id)
            .cloned()
    }

    pub fn put_page(&self, collection: &str, page: StaticPage) -> Option<StaticPage> {
        let mut collections = rw_write(&self.collections, SOURCE, "put_page");
        collections
            .entry(collection.to_string())
            .or_default()
            .pages
            .insert(page.id.clone(), page)
    }

    /// Make every subsequent load fail, to exercise reindex failure handling.
    pub fn fail_loads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("store marked unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CanonicalStore for MemoryStore {
    async fn load_all_entries(&self, collection: &str) -> Result<Vec<Entry>, RepoError> {
        self.check_available()?;
        Ok(rw_read(&self.collections, SOURCE, "load_all_entries")
            .get(collection)
            .map(|data| data.entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn load_all_responses(&self, collection: &str) -> Result<Vec<Response>, RepoError> {
        self.check_available()?;
        Ok(rw_read(&self.collections, SOURCE, "load_all_responses")
            .get(collection)
            .map(|data| data.responses.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn load_static_pages(&self, collection: &str) -> Result<Vec<StaticPage>, RepoError> {
        self.check_available()?;
        Ok(rw_read(&self.collections, SOURCE, "load_static_pages")
            .get(collection)
            .map(|data| data.pages.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Read-only store over a directory of `<collection>.toml` exports.
#[derive(Debug, Clone)]
pub struct TomlStore {
    root: PathBuf,
}

impl TomlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.toml"))
    }

    pub async fn load_document(&self, collection: &str) -> Result<StoreDocument, RepoError> {
        let path = self.path_for(collection);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepoError::UnknownCollection {
                    collection: collection.to_string(),
                });
            }
            Err(err) => return Err(RepoError::from_persistence(err)),
        };

        let document: StoreDocument = toml::from_str(&raw).map_err(|err| {
            RepoError::invalid_record(format!("{}: {err}", path.display()))
        })?;
        document.validate()?;
        debug!(
            path = %path.display(),
            entries = document.entries.len(),
            responses = document.responses.len(),
            pages = document.pages.len(),
            "Store document loaded"
        );
        Ok(document)
    }

    /// Write a collection export, replacing any existing file.
    pub async fn save_document(
        &self,
        collection: &str,
        document: &StoreDocument,
    ) -> Result<(), RepoError> {
        document.validate()?;
        let rendered = toml::to_string(document).map_err(RepoError::from_persistence)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(RepoError::from_persistence)?;
        let path = self.path_for(collection);
        tokio::fs::write(&path, rendered)
            .await
            .map_err(RepoError::from_persistence)?;
        info!(path = %path.display(), "Store document written");
        Ok(())
    }
}

#[async_trait]
impl CanonicalStore for TomlStore {
    async fn load_all_entries(&self, collection: &str) -> Result<Vec<Entry>, RepoError> {
        Ok(self.load_document(collection).await?.entries)
    }

    async fn load_all_responses(&self, collection: &str) -> Result<Vec<Response>, RepoError> {
        Ok(self.load_document(collection).await?.responses)
    }

    async fn load_static_pages(&self, collection: &str) -> Result<Vec<StaticPage>, RepoError> {
        Ok(self.load_document(collection).await?.pages)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::{EntryState, ModerationState, ResponseKind};

    fn entry(id: &str) -> Entry {
        Entry {
            id: id.to_string(),
            title: "Hello".to_string(),
            body: "world".to_string(),
            author: "alice".to_string(),
            category: Some("/tech".to_string()),
            tags: BTreeSet::from(["go".to_string()]),
            state: EntryState::Published,
            date: datetime!(2023-06-15 10:00 UTC),
        }
    }

    fn response(id: &str, entry_id: &str) -> Response {
        Response {
            id: id.to_string(),
            entry_id: entry_id.to_string(),
            kind: ResponseKind::TrackBack,
            state: ModerationState::Pending,
            author: "bob".to_string(),
            body: String::new(),
            date: datetime!(2023-06-16 10:00 UTC),
        }
    }

    #[tokio::test]
    async fn memory_store_cascades_entry_removal() {
        let store = MemoryStore::new();
        store.put_entry("blog", entry("e1"));
        store.put_response("blog", response("r1", "e1"));

        let (_, responses) = store.remove_entry("blog", "e1").expect("entry existed");
        assert_eq!(responses.len(), 1);
        assert!(store.load_all_responses("blog").await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn toml_store_round_trips_a_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TomlStore::new(dir.path());
        let document = StoreDocument {
            entries: vec![entry("e1")],
            responses: vec![response("r1", "e1")],
            pages: Vec::new(),
        };

        store.save_document("blog", &document).await.expect("save");
        let loaded = store.load_document("blog").await.expect("load");
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn toml_store_reports_missing_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TomlStore::new(dir.path());

        let err = store.load_all_entries("absent").await.expect_err("no file");
        assert!(matches!(err, RepoError::UnknownCollection { .. }));
    }

    #[test]
    fn validation_rejects_orphaned_responses() {
        let document = StoreDocument {
            entries: vec![entry("e1")],
            responses: vec![response("r1", "missing")],
            pages: Vec::new(),
        };
        assert!(matches!(
            document.validate(),
            Err(RepoError::InvalidRecord { .. })
        ));
    }
}
