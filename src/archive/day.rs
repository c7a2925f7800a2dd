use std::sync::Arc;

use crate::domain::date::SimpleDate;
use crate::domain::entities::Entry;
use crate::domain::recency::RecencyList;

/// Entries filed under one calendar day, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayNode {
    date: SimpleDate,
    entries: RecencyList,
    published: RecencyList,
}

impl DayNode {
    pub fn new(date: SimpleDate) -> Self {
        Self {
            date,
            entries: RecencyList::new(),
            published: RecencyList::new(),
        }
    }

    pub fn date(&self) -> SimpleDate {
        self.date
    }

    pub fn entries(&self) -> &RecencyList {
        &self.entries
    }

    pub fn published(&self) -> &RecencyList {
        &self.published
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, entry: &Entry) {
        self.entries.insert(&entry.id, entry.date);
        if entry.is_published() {
            self.published.insert(&entry.id, entry.date);
        } else {
            self.published.remove(&entry.id);
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        self.published.remove(id);
        self.entries.remove(id)
    }
}

/// A day bucket; empty days are synthesized rather than stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Day {
    Populated(Arc<DayNode>),
    Empty(SimpleDate),
}

impl Day {
    pub fn date(&self) -> SimpleDate {
        match self {
            Day::Populated(node) => node.date,
            Day::Empty(date) => *date,
        }
    }

    pub fn year(&self) -> i32 {
        self.date().year()
    }

    pub fn month(&self) -> u8 {
        self.date().month()
    }

    pub fn day(&self) -> u8 {
        self.date().day()
    }

    pub fn has_blog_entries(&self) -> bool {
        matches!(self, Day::Populated(node) if !node.is_empty())
    }

    pub fn number_of_blog_entries(&self) -> usize {
        match self {
            Day::Populated(node) => node.entries.len(),
            Day::Empty(_) => 0,
        }
    }

    /// Entry ids for the day, newest first.
    pub fn blog_entries(&self) -> Vec<String> {
        match self {
            Day::Populated(node) => node.entries.ids(),
            Day::Empty(_) => Vec::new(),
        }
    }

    pub fn published_blog_entries(&self) -> Vec<String> {
        match self {
            Day::Populated(node) => node.published.ids(),
            Day::Empty(_) => Vec::new(),
        }
    }

    pub fn node(&self) -> Option<&Arc<DayNode>> {
        match self {
            Day::Populated(node) => Some(node),
            Day::Empty(_) => None,
        }
    }
}
