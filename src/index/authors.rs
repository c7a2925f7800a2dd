use std::collections::{BTreeMap, BTreeSet};

use crate::domain::entities::Entry;

use super::EntryIndex;
use super::classified::EntryBuckets;

#[derive(Debug)]
pub struct AuthorIndex {
    inner: EntryBuckets,
}

impl Default for AuthorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorIndex {
    pub fn new() -> Self {
        Self {
            inner: EntryBuckets::new("authors", author_of),
        }
    }

    pub fn entries(&self, author: &str) -> Vec<String> {
        self.inner.buckets.get(author.trim())
    }

    pub fn number_of_entries(&self, author: &str) -> usize {
        self.inner.buckets.count(author.trim())
    }

    pub fn authors(&self) -> Vec<String> {
        self.inner.buckets.keys()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.buckets.snapshot()
    }
}

fn author_of(entry: &Entry) -> BTreeSet<String> {
    entry.author_key().map(str::to_string).into_iter().collect()
}

impl EntryIndex for AuthorIndex {
    fn name(&self) -> &'static str {
        "authors"
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
