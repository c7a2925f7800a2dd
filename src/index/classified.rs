use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use time::OffsetDateTime;
use tracing::debug;

use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::Entry;
use crate::domain::recency::RecencyList;

const SOURCE: &str = "archivist::index::classified";

/// Classification key to recency-ordered identifiers.
///
/// Buckets appear on first insert and disappear when their last identifier
/// is removed, so `keys()` only ever lists live classifications.
#[derive(Debug)]
pub(crate) struct ClassifiedIndex {
    name: &'static str,
    buckets: RwLock<BTreeMap<String, RecencyList>>,
}

impl ClassifiedIndex {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            buckets: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn add(&self, key: &str, id: &str, at: OffsetDateTime) -> bool {
        let mut buckets = rw_write(&self.buckets, SOURCE, "add");
        let added = buckets.entry(key.to_string()).or_default().insert(id, at);
        debug!(index = self.name, key, id, added, "Bucket add");
        added
    }

    pub(crate) fn remove(&self, key: &str, id: &str) -> bool {
        let mut buckets = rw_write(&self.buckets, SOURCE, "remove");
        remove_from(&mut buckets, key, id)
    }

    /// Apply a classification change in one step: drop `id` from keys it no
    /// longer carries, then (re)insert it under every current key.
    pub(crate) fn move_entry(
        &self,
        old_keys: &BTreeSet<String>,
        new_keys: &BTreeSet<String>,
        id: &str,
        at: OffsetDateTime,
    ) {
        let mut buckets = rw_write(&self.buckets, SOURCE, "move_entry");
        for stale in old_keys.difference(new_keys) {
            remove_from(&mut buckets, stale, id);
        }
        for key in new_keys {
            buckets.entry(key.clone()).or_default().insert(id, at);
        }
        debug!(
            index = self.name,
            id,
            from = ?old_keys,
            to = ?new_keys,
            "Bucket move"
        );
    }

    /// Identifiers under `key`, newest first; unknown keys yield an empty list.
    pub(crate) fn get(&self, key: &str) -> Vec<String> {
        rw_read(&self.buckets, SOURCE, "get")
            .get(key)
            .map(RecencyList::ids)
            .unwrap_or_default()
    }

    /// Merged view of every bucket selected by `select`.
    pub(crate) fn merged(&self, select: impl Fn(&str) -> bool) -> RecencyList {
        let buckets = rw_read(&self.buckets, SOURCE, "merged");
        RecencyList::merged(
            buckets
                .iter()
                .filter(|(key, _)| select(key))
                .map(|(_, list)| list),
        )
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        rw_read(&self.buckets, SOURCE, "count")
            .get(key)
            .map_or(0, RecencyList::len)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        rw_read(&self.buckets, SOURCE, "keys").keys().cloned().collect()
    }

    pub(crate) fn counts(&self) -> Vec<(String, usize)> {
        rw_read(&self.buckets, SOURCE, "counts")
            .iter()
            .map(|(key, list)| (key.clone(), list.len()))
            .collect()
    }

    pub(crate) fn clear(&self) {
        rw_write(&self.buckets, SOURCE, "clear").clear();
    }

    /// Swap in freshly built buckets; empty buckets are discarded.
    pub(crate) fn replace_all(&self, mut fresh: BTreeMap<String, RecencyList>) {
        fresh.retain(|_, list| !list.is_empty());
        let total = fresh.len();
        *rw_write(&self.buckets, SOURCE, "replace_all") = fresh;
        debug!(index = self.name, buckets = total, "Buckets replaced");
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        rw_read(&self.buckets, SOURCE, "snapshot")
            .iter()
            .map(|(key, list)| (key.clone(), list.ids()))
            .collect()
    }
}

/// A [`ClassifiedIndex`] fed by entries through a key extraction function.
#[derive(Debug)]
pub(crate) struct EntryBuckets {
    pub(crate) buckets: ClassifiedIndex,
    classify: fn(&Entry) -> BTreeSet<String>,
}

impl EntryBuckets {
    pub(crate) fn new(name: &'static str, classify: fn(&Entry) -> BTreeSet<String>) -> Self {
        Self {
            buckets: ClassifiedIndex::new(name),
            classify,
        }
    }

    pub(crate) fn index(&self, entries: &[Entry]) {
        let mut fresh: BTreeMap<String, RecencyList> = BTreeMap::new();
        for entry in entries {
            for key in (self.classify)(entry) {
                fresh.entry(key).or_default().insert(&entry.id, entry.date);
            }
        }
        self.buckets.replace_all(fresh);
    }

    pub(crate) fn add(&self, entry: &Entry) {
        for key in (self.classify)(entry) {
            self.buckets.add(&key, &entry.id, entry.date);
        }
    }

    pub(crate) fn update(&self, previous: &Entry, current: &Entry) {
        if previous.id != current.id {
            self.remove(previous);
            self.add(current);
            return;
        }
        self.buckets.move_entry(
            &(self.classify)(previous),
            &(self.classify)(current),
            &current.id,
            current.date,
        );
    }

    pub(crate) fn remove(&self, entry: &Entry) {
        for key in (self.classify)(entry) {
            self.buckets.remove(&key, &entry.id);
        }
    }
}

fn remove_from(buckets: &mut BTreeMap<String, RecencyList>, key: &str, id: &str) -> bool {
    let Some(list) = buckets.get_mut(key) else {
        return false;
    };
    let removed = list.remove(id);
    if list.is_empty() {
        buckets.remove(key);
    }
    removed
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn unknown_key_is_empty() {
        let index = ClassifiedIndex::new("test");
        assert!(index.get("missing").is_empty());
        assert_eq!(index.count("missing"), 0);
    }

    #[test]
    fn buckets_are_newest_first() {
        let index = ClassifiedIndex::new("test");
        index.add("go", "old", datetime!(2023-01-01 0:00 UTC));
        index.add("go", "new", datetime!(2023-02-01 0:00 UTC));
        assert_eq!(index.get("go"), vec!["new", "old"]);
        assert_eq!(index.count("go"), 2);
    }

    #[test]
    fn move_entry_only_touches_changed_keys() {
        let index = ClassifiedIndex::new("test");
        let at = datetime!(2023-06-15 10:00 UTC);
        index.move_entry(&BTreeSet::new(), &keys(&["go", "rust"]), "e1", at);
        index.move_entry(&keys(&["go", "rust"]), &keys(&["rust", "zig"]), "e1", at);

        assert!(index.get("go").is_empty());
        assert_eq!(index.get("rust"), vec!["e1"]);
        assert_eq!(index.get("zig"), vec!["e1"]);
        assert_eq!(index.keys(), vec!["rust", "zig"]);
    }

    #[test]
    fn removing_last_id_drops_the_bucket() {
        let index = ClassifiedIndex::new("test");
        index.add("go", "e1", datetime!(2023-06-15 10:00 UTC));
        assert!(index.remove("go", "e1"));
        assert!(index.keys().is_empty());
        assert!(!index.remove("go", "e1"));
    }

    #[test]
    fn entry_buckets_file_under_every_key() {
        let buckets = EntryBuckets::new("tags", Entry::tag_keys);
        let entry = Entry {
            id: "e1".to_string(),
            title: String::new(),
            body: String::new(),
            author: "alice".to_string(),
            category: None,
            tags: keys(&["Go", "rust"]),
            state: crate::domain::types::EntryState::Published,
            date: datetime!(2023-06-15 10:00 UTC),
        };

        buckets.add(&entry);
        buckets.add(&entry);
        assert_eq!(buckets.buckets.get("go"), vec!["e1"]);
        assert_eq!(buckets.buckets.count("rust"), 1);

        buckets.remove(&entry);
        assert!(buckets.buckets.keys().is_empty());
    }

    #[test]
    fn clear_is_safe_when_empty() {
        let index = ClassifiedIndex::new("test");
        index.clear();
        index.clear();
        assert!(index.snapshot().is_empty());
    }
}
