//! Recency-ordered identifier lists shared by the indexes and the archive.

use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped {
    pub id: String,
    pub at: OffsetDateTime,
}

/// Identifiers ordered newest first; ties on the timestamp fall back to the
/// identifier, descending, so the order never depends on insertion history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecencyList {
    items: Vec<Stamped>,
}

impl RecencyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, repositioning it when already present.
    ///
    /// Returns true when the identifier was not present before.
    pub fn insert(&mut self, id: &str, at: OffsetDateTime) -> bool {
        let existed = self.remove(id);
        let position = self
            .items
            .partition_point(|item| (item.at, item.id.as_str()) > (at, id));
        self.items.insert(
            position,
            Stamped {
                id: id.to_string(),
                at,
            },
        );
        !existed
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Stamped> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&Stamped> {
        self.items.first()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stamped> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merge several lists into one, dropping duplicate identifiers.
    pub fn merged<'a>(lists: impl IntoIterator<Item = &'a RecencyList>) -> RecencyList {
        let mut merged = RecencyList::new();
        for list in lists {
            for item in &list.items {
                merged.insert(&item.id, item.at);
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn keeps_newest_first() {
        let mut list = RecencyList::new();
        list.insert("a", datetime!(2023-01-01 0:00 UTC));
        list.insert("c", datetime!(2023-03-01 0:00 UTC));
        list.insert("b", datetime!(2023-02-01 0:00 UTC));

        assert_eq!(list.ids(), vec!["c", "b", "a"]);
    }

    #[test]
    fn reinsert_moves_identifier() {
        let mut list = RecencyList::new();
        assert!(list.insert("a", datetime!(2023-01-01 0:00 UTC)));
        list.insert("b", datetime!(2023-02-01 0:00 UTC));
        assert!(!list.insert("a", datetime!(2023-03-01 0:00 UTC)));

        assert_eq!(list.ids(), vec!["a", "b"]);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn equal_timestamps_order_by_identifier() {
        let at = datetime!(2023-01-01 0:00 UTC);
        let mut forward = RecencyList::new();
        forward.insert("x", at);
        forward.insert("y", at);

        let mut backward = RecencyList::new();
        backward.insert("y", at);
        backward.insert("x", at);

        assert_eq!(forward, backward);
        assert_eq!(forward.ids(), vec!["y", "x"]);
    }

    #[test]
    fn merged_deduplicates() {
        let mut left = RecencyList::new();
        left.insert("a", datetime!(2023-01-01 0:00 UTC));
        let mut right = RecencyList::new();
        right.insert("a", datetime!(2023-01-01 0:00 UTC));
        right.insert("b", datetime!(2023-05-01 0:00 UTC));

        let merged = RecencyList::merged([&left, &right]);
        assert_eq!(merged.ids(), vec!["b", "a"]);
    }
}
