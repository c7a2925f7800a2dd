use std::collections::{BTreeMap, BTreeSet};

use crate::domain::categories::{ROOT_CATEGORY, normalize_category_id};
use crate::domain::entities::Entry;

use super::EntryIndex;
use super::classified::EntryBuckets;

/// Entries by category path.
///
/// Entries are filed under the exact path they carry. Lookups through
/// [`CategoryIndex::entries`] also include every category beneath the
/// requested one, so `/tech` lists entries filed under `/tech/rust`.
#[derive(Debug)]
pub struct CategoryIndex {
    inner: EntryBuckets,
}

impl Default for CategoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryIndex {
    pub fn new() -> Self {
        Self {
            inner: EntryBuckets::new("categories", category_of),
        }
    }

    /// Entries under `category` and its descendants, newest first.
    pub fn entries(&self, category: &str) -> Vec<String> {
        let Some(id) = category_path(category) else {
            return Vec::new();
        };
        if id == ROOT_CATEGORY {
            return self.inner.buckets.merged(|_| true).ids();
        }
        let prefix = format!("{id}/");
        self.inner
            .buckets
            .merged(|key| key == id || key.starts_with(&prefix))
            .ids()
    }

    /// Entries filed directly under `category`.
    pub fn direct_entries(&self, category: &str) -> Vec<String> {
        category_path(category)
            .map(|id| self.inner.buckets.get(&id))
            .unwrap_or_default()
    }

    pub fn number_of_entries(&self, category: &str) -> usize {
        category_path(category).map_or(0, |id| self.inner.buckets.count(&id))
    }

    pub fn categories(&self) -> Vec<String> {
        self.inner.buckets.keys()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.buckets.snapshot()
    }
}

/// Category path for a raw value; a missing leading slash is tolerated.
pub fn category_path(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('/') {
        normalize_category_id(raw).ok()
    } else {
        normalize_category_id(&format!("/{raw}")).ok()
    }
}

fn category_of(entry: &Entry) -> BTreeSet<String> {
    entry
        .category_key()
        .and_then(category_path)
        .into_iter()
        .collect()
}

impl EntryIndex for CategoryIndex {
    fn name(&self) -> &'static str {
        "categories"
    }

    fn index(&self, entries: &[Entry]) {
        self.inner.index(entries);
    }

    fn clear(&self) {
        self.inner.buckets.clear();
    }

    fn add(&self, entry: &Entry) {
        self.inner.add(entry);
    }

    fn update(&self, previous: &Entry, current: &Entry) {
        self.inner.update(previous, current);
    }

    fn remove(&self, entry: &Entry) {
        self.inner.remove(entry);
    }
}
