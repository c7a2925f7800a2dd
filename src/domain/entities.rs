use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::types::{EntryState, ModerationState, ResponseKind};

/// A blog entry as loaded from the canonical store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub state: EntryState,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

impl Entry {
    pub fn is_published(&self) -> bool {
        self.state.is_published()
    }

    /// Normalised, de-duplicated tag keys.
    pub fn tag_keys(&self) -> BTreeSet<String> {
        self.tags
            .iter()
            .filter_map(|tag| normalize_tag(tag))
            .collect()
    }

    pub fn category_key(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
    }

    pub fn author_key(&self) -> Option<&str> {
        let author = self.author.trim();
        (!author.is_empty()).then_some(author)
    }
}

/// A comment or trackback attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub entry_id: String,
    #[serde(default)]
    pub kind: ResponseKind,
    pub state: ModerationState,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Lowercases and trims a tag; blank tags are dropped.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn entry(tags: &[&str]) -> Entry {
        Entry {
            id: "1".to_string(),
            title: "Hello".to_string(),
            body: String::new(),
            author: "  alice ".to_string(),
            category: Some(" ".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            state: EntryState::Published,
            date: datetime!(2023-06-15 10:00 UTC),
        }
    }

    #[test]
    fn tag_keys_are_normalised() {
        let entry = entry(&["Go", " go ", "Rust  Lang", ""]);
        let keys: Vec<_> = entry.tag_keys().into_iter().collect();
        assert_eq!(keys, vec!["go".to_string(), "rust lang".to_string()]);
    }

    #[test]
    fn blank_classifications_are_absent() {
        let entry = entry(&[]);
        assert_eq!(entry.category_key(), None);
        assert_eq!(entry.author_key(), Some("alice"));
    }
}
