use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::entities::{Entry, normalize_tag};

use super::EntryIndex;
use super::classified::EntryBuckets;

/// Highest rank handed out by [`TagIndex::cloud`].
pub const MAX_TAG_RANK: u8 = 10;

/// One tag with its entry count and a popularity rank in `1..=10`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
    pub rank: u8,
}

#[derive(Debug)]
pub struct TagIndex {
    inner: EntryBuckets,
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TagIndex {
    pub fn new() -> Self {
        Self {
            inner: EntryBuckets::new("tags", Entry::tag_keys),
        }
    }

    /// Entries carrying `tag`, newest first. The tag is normalised before lookup.
    pub fn entries(&self, tag: &str) -> Vec<String> {
        normalize_tag(tag)
            .map(|tag| self.inner.buckets.get(&tag))
            .unwrap_or_default()
    }

    pub fn number_of_entries(&self, tag: &str) -> usize {
        normalize_tag(tag).map_or(0, |tag| self.inner.buckets.count(&tag))
    }

    pub fn tags(&self) -> Vec<String> {
        self.inner.buckets.keys()
    }

    /// Every tag with its count, alphabetically, ranked relative to the most used tag.
    pub fn cloud(&self) -> Vec<TagCount> {
        let counts = self.inner.buckets.counts();
        let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);
        counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                rank: rank(count, max),
                tag,
                count,
            })
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.buckets.snapshot()
    }
}

fn rank(count: usize, max: usize) -> u8 {
    if max == 0 {
        return 1;
    }
    let scaled = (count * usize::from(MAX_TAG_RANK)).div_ceil(max);
    u8::try_from(scaled.clamp(1, usize::from(MAX_TAG_RANK))).unwrap_or(MAX_TAG_RANK)
}

impl EntryIndex for TagIndex {
    fn name(&self) -> &'static str {
        "tags"
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
