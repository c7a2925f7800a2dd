//! Secondary indexes over a collection's entries and responses.
//!
//! Every index maps a classification key to identifiers ordered newest
//! first. Unknown keys resolve to empty lists, counts are read off the
//! maintained buckets, and `clear` is always safe. The indexes are rebuilt
//! wholesale by `index` during a reindex and maintained incrementally by the
//! coordinator's built-in listeners in between.

mod authors;
mod categories;
mod classified;
mod entries;
mod pages;
mod responses;
mod tags;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use authors::AuthorIndex;
pub use categories::{CategoryIndex, category_path};
pub use entries::BlogEntryIndex;
pub use pages::StaticPageIndex;
pub use responses::ResponseIndex;
pub use tags::{MAX_TAG_RANK, TagCount, TagIndex};

use crate::domain::clock::Clock;
use crate::domain::entities::Entry;

/// Contract shared by the indexes classifying entries.
pub trait EntryIndex: Send + Sync {
    fn name(&self) -> &'static str;

    /// Replace the whole index with the classification of `entries`.
    fn index(&self, entries: &[Entry]);

    fn clear(&self);

    fn add(&self, entry: &Entry);

    /// Re-file an edited entry; only buckets whose membership changed are touched.
    fn update(&self, previous: &Entry, current: &Entry);

    fn remove(&self, entry: &Entry);
}

/// The secondary indexes owned by one content collection.
#[derive(Debug, Clone)]
pub struct Indexes {
    pub entries: Arc<BlogEntryIndex>,
    pub responses: Arc<ResponseIndex>,
    pub tags: Arc<TagIndex>,
    pub categories: Arc<CategoryIndex>,
    pub authors: Arc<AuthorIndex>,
    pub pages: Arc<StaticPageIndex>,
}

impl Indexes {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(BlogEntryIndex::new(clock)),
            responses: Arc::new(ResponseIndex::new()),
            tags: Arc::new(TagIndex::new()),
            categories: Arc::new(CategoryIndex::new()),
            authors: Arc::new(AuthorIndex::new()),
            pages: Arc::new(StaticPageIndex::new()),
        }
    }

    /// The entry-classifying indexes, in the order listeners are installed.
    pub fn entry_indexes(&self) -> Vec<Arc<dyn EntryIndex>> {
        vec![
            Arc::clone(&self.entries) as Arc<dyn EntryIndex>,
            Arc::clone(&self.tags) as Arc<dyn EntryIndex>,
            Arc::clone(&self.categories) as Arc<dyn EntryIndex>,
            Arc::clone(&self.authors) as Arc<dyn EntryIndex>,
        ]
    }

    pub fn clear(&self) {
        for index in self.entry_indexes() {
            index.clear();
        }
        self.responses.clear();
        self.pages.clear();
    }

    /// Bucket contents of every index, keyed `index/key`.
    pub fn snapshot(&self) -> IndexSnapshot {
        let mut buckets = BTreeMap::new();
        let mut put = |index: &str, contents: BTreeMap<String, Vec<String>>| {
            for (key, ids) in contents {
                buckets.insert(format!("{index}/{key}"), ids);
            }
        };

        put(
            "entries",
            BTreeMap::from([
                ("all".to_string(), self.entries.entries()),
                ("published".to_string(), self.entries.published()),
                ("unpublished".to_string(), self.entries.unpublished()),
            ]),
        );
        put("responses", self.responses.snapshot());
        put("tags", self.tags.snapshot());
        put("categories", self.categories.snapshot());
        put("authors", self.authors.snapshot());
        put(
            "pages",
            self.pages
                .names()
                .into_iter()
                .filter_map(|name| {
                    let id = self.pages.page_id(&name)?;
                    Some((name, vec![id]))
                })
                .collect(),
        );

        IndexSnapshot { buckets }
    }
}

/// Point-in-time copy of every bucket, used to compare index states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub buckets: BTreeMap<String, Vec<String>>,
}

impl IndexSnapshot {
    pub fn bucket(&self, key: &str) -> &[String] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}
