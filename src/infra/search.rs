//! In-process full-text search adapter.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::repos::{SearchError, SearchIndex};
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{Entry, StaticPage};

const SOURCE: &str = "archivist::infra::search";

#[derive(Debug, Default)]
struct Documents {
    entries: BTreeMap<String, BTreeSet<String>>,
    pages: BTreeMap<String, BTreeSet<String>>,
}

/// Term-set search over entries and static pages.
///
/// A document matches when it contains every query term. No ranking.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    documents: RwLock<Documents>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry ids matching every term of `query`, in id order.
    pub fn search(&self, query: &str) -> Vec<String> {
        let documents = rw_read(&self.documents, SOURCE, "search");
        matching(&documents.entries, query)
    }

    pub fn search_pages(&self, query: &str) -> Vec<String> {
        let documents = rw_read(&self.documents, SOURCE, "search_pages");
        matching(&documents.pages, query)
    }

    pub fn number_of_entries(&self) -> usize {
        rw_read(&self.documents, SOURCE, "len").entries.len()
    }

    pub fn number_of_pages(&self) -> usize {
        rw_read(&self.documents, SOURCE, "len").pages.len()
    }
}

fn matching(documents: &BTreeMap<String, BTreeSet<String>>, query: &str) -> Vec<String> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return Vec::new();
    }
    documents
        .iter()
        .filter(|(_, words)| terms.is_subset(words))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Lowercased alphanumeric words.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn entry_terms(entry: &Entry) -> BTreeSet<String> {
    let mut terms = tokenize(&entry.title);
    terms.extend(tokenize(&entry.body));
    for tag in &entry.tags {
        terms.extend(tokenize(tag));
    }
    terms
}

fn page_terms(page: &StaticPage) -> BTreeSet<String> {
    let mut terms = tokenize(&page.name);
    terms.extend(tokenize(&page.title));
    terms.extend(tokenize(&page.body));
    terms
}

fn document_id(id: &str) -> Result<(), SearchError> {
    if id.trim().is_empty() {
        return Err(SearchError::rejected(id, "document id is blank"));
    }
    Ok(())
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    /// Rejects the whole batch when any entry has a blank id.
    async fn index_entries(&self, entries: &[Entry]) -> Result<(), SearchError> {
        for entry in entries {
            document_id(&entry.id)?;
        }
        let mut documents = rw_write(&self.documents, SOURCE, "index_entries");
        for entry in entries {
            documents
                .entries
                .insert(entry.id.clone(), entry_terms(entry));
        }
        Ok(())
    }

    async fn index_static_pages(&self, pages: &[StaticPage]) -> Result<(), SearchError> {
        for page in pages {
            document_id(&page.id)?;
        }
        let mut documents = rw_write(&self.documents, SOURCE, "index_static_pages");
        documents.pages = pages
            .iter()
            .map(|page| (page.id.clone(), page_terms(page)))
            .collect();
        Ok(())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        *rw_write(&self.documents, SOURCE, "clear") = Documents::default();
        Ok(())
    }

    async fn add_entry(&self, entry: &Entry) -> Result<(), SearchError> {
        document_id(&entry.id)?;
        rw_write(&self.documents, SOURCE, "add_entry")
            .entries
            .insert(entry.id.clone(), entry_terms(entry));
        Ok(())
    }

    async fn remove_entry(&self, id: &str) -> Result<(), SearchError> {
        rw_write(&self.documents, SOURCE, "remove_entry")
            .entries
            .remove(id);
        Ok(())
    }
}
