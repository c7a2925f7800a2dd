use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::archive::Archive;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::clock::Clock;
use crate::domain::date::SimpleDate;
use crate::domain::entities::Entry;
use crate::domain::recency::RecencyList;

use super::EntryIndex;

const SOURCE: &str = "archivist::index::entries";

#[derive(Debug)]
struct Timeline {
    all: RecencyList,
    published: RecencyList,
    unpublished: RecencyList,
    archive: Arc<Archive>,
}

impl Timeline {
    fn empty(clock: &Arc<dyn Clock>) -> Self {
        Self {
            all: RecencyList::new(),
            published: RecencyList::new(),
            unpublished: RecencyList::new(),
            archive: Arc::new(Archive::empty(Arc::clone(clock))),
        }
    }

    fn insert(&mut self, entry: &Entry) {
        self.all.insert(&entry.id, entry.date);
        if entry.is_published() {
            self.unpublished.remove(&entry.id);
            self.published.insert(&entry.id, entry.date);
        } else {
            self.published.remove(&entry.id);
            self.unpublished.insert(&entry.id, entry.date);
        }
    }

    /// Day `id` is currently filed under, if indexed.
    fn filed_on(&self, id: &str) -> Option<SimpleDate> {
        let position = self.all.position(id)?;
        self.all
            .get(position)
            .map(|item| self.archive.filing_day(item.at))
    }

    fn remove(&mut self, id: &str) {
        self.all.remove(id);
        self.published.remove(id);
        self.unpublished.remove(id);
    }
}

/// Global entry buckets plus the date archive derived from them.
///
/// The archive snapshot is swapped under the same lock as the buckets, so a
/// reader never sees an archive that disagrees with `entries()`.
#[derive(Debug)]
pub struct BlogEntryIndex {
    clock: Arc<dyn Clock>,
    timeline: RwLock<Timeline>,
}

impl BlogEntryIndex {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let timeline = Timeline::empty(&clock);
        Self {
            clock,
            timeline: RwLock::new(timeline),
        }
    }

    /// Every entry id, newest first.
    pub fn entries(&self) -> Vec<String> {
        rw_read(&self.timeline, SOURCE, "entries").all.ids()
    }

    pub fn published(&self) -> Vec<String> {
        rw_read(&self.timeline, SOURCE, "published").published.ids()
    }

    pub fn unpublished(&self) -> Vec<String> {
        rw_read(&self.timeline, SOURCE, "unpublished").unpublished.ids()
    }

    pub fn recent(&self, limit: usize) -> Vec<String> {
        let timeline = rw_read(&self.timeline, SOURCE, "recent");
        timeline.all.iter().take(limit).map(|item| item.id.clone()).collect()
    }

    pub fn recent_published(&self, limit: usize) -> Vec<String> {
        let timeline = rw_read(&self.timeline, SOURCE, "recent_published");
        timeline
            .published
            .iter()
            .take(limit)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn number_of_entries(&self) -> usize {
        rw_read(&self.timeline, SOURCE, "count").all.len()
    }

    pub fn number_of_published_entries(&self) -> usize {
        rw_read(&self.timeline, SOURCE, "count").published.len()
    }

    pub fn number_of_unpublished_entries(&self) -> usize {
        rw_read(&self.timeline, SOURCE, "count").unpublished.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        rw_read(&self.timeline, SOURCE, "contains").all.contains(id)
    }

    pub fn is_published(&self, id: &str) -> bool {
        rw_read(&self.timeline, SOURCE, "is_published")
            .published
            .contains(id)
    }

    /// The published entry just older than `id`, if any.
    ///
    /// Returns `None` when `id` is the oldest published entry or is not published.
    pub fn previous_entry(&self, id: &str) -> Option<String> {
        let timeline = rw_read(&self.timeline, SOURCE, "previous_entry");
        let position = timeline.published.position(id)?;
        timeline
            .published
            .get(position + 1)
            .map(|item| item.id.clone())
    }

    /// The published entry just newer than `id`, if any.
    pub fn next_entry(&self, id: &str) -> Option<String> {
        let timeline = rw_read(&self.timeline, SOURCE, "next_entry");
        let position = timeline.published.position(id)?;
        let newer = position.checked_sub(1)?;
        timeline.published.get(newer).map(|item| item.id.clone())
    }

    /// Date of the newest entry in any state.
    pub fn last_modified(&self) -> Option<time::OffsetDateTime> {
        rw_read(&self.timeline, SOURCE, "last_modified")
            .all
            .first()
            .map(|item| item.at)
    }

    /// Current archive snapshot. Later updates produce a new snapshot and
    /// leave this one untouched.
    pub fn archive(&self) -> Arc<Archive> {
        Arc::clone(&rw_read(&self.timeline, SOURCE, "archive").archive)
    }
}

impl EntryIndex for BlogEntryIndex {
    fn name(&self) -> &'static str {
        "entries"
    }

    fn index(&self, entries: &[Entry]) {
        let mut fresh = Timeline::empty(&self.clock);
        for entry in entries {
            fresh.insert(entry);
        }
        fresh.archive = Arc::new(Archive::from_entries(Arc::clone(&self.clock), entries));
        let total = fresh.all.len();
        *rw_write(&self.timeline, SOURCE, "index") = fresh;
        debug!(entries = total, "Entry timeline rebuilt");
    }

    fn clear(&self) {
        *rw_write(&self.timeline, SOURCE, "clear") = Timeline::empty(&self.clock);
    }

    fn add(&self, entry: &Entry) {
        let mut timeline = rw_write(&self.timeline, SOURCE, "add");
        let mut archive = Archive::clone(&timeline.archive);
        if let Some(day) = timeline.filed_on(&entry.id) {
            archive = archive.without_entry(&entry.id, day);
        }
        timeline.insert(entry);
        timeline.archive = Arc::new(archive.with_entry(entry));
        debug!(entry_id = %entry.id, published = entry.is_published(), "Entry indexed");
    }

    fn update(&self, previous: &Entry, current: &Entry) {
        let mut timeline = rw_write(&self.timeline, SOURCE, "update");
        let mut archive = Archive::clone(&timeline.archive);
        for id in [&previous.id, &current.id] {
            if let Some(day) = timeline.filed_on(id) {
                archive = archive.without_entry(id, day);
            }
        }
        timeline.remove(&previous.id);
        timeline.insert(current);
        timeline.archive = Arc::new(archive.with_entry(current));
        debug!(
            entry_id = %current.id,
            was_published = previous.is_published(),
            published = current.is_published(),
            "Entry reindexed"
        );
    }

    fn remove(&self, entry: &Entry) {
        let mut timeline = rw_write(&self.timeline, SOURCE, "remove");
        let day = timeline
            .filed_on(&entry.id)
            .unwrap_or_else(|| timeline.archive.filing_day(entry.date));
        timeline.remove(&entry.id);
        timeline.archive = Arc::new(timeline.archive.without_entry(&entry.id, day));
        debug!(entry_id = %entry.id, "Entry unindexed");
    }
}
