use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::StaticPage;

const SOURCE: &str = "archivist::index::pages";

/// Static page name to page id. Names are matched case-insensitively.
#[derive(Debug, Default)]
pub struct StaticPageIndex {
    names: RwLock<BTreeMap<String, String>>,
}

impl StaticPageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, pages: &[StaticPage]) {
        let fresh = pages
            .iter()
            .filter_map(|page| page_key(&page.name).map(|name| (name, page.id.clone())))
            .collect();
        *rw_write(&self.names, SOURCE, "index") = fresh;
    }

    pub fn clear(&self) {
        rw_write(&self.names, SOURCE, "clear").clear();
    }

    pub fn page_id(&self, name: &str) -> Option<String> {
        let name = page_key(name)?;
        rw_read(&self.names, SOURCE, "page_id").get(&name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.page_id(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        rw_read(&self.names, SOURCE, "names").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.names, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn page_key(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, name: &str) -> StaticPage {
        StaticPage {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn resolves_names_case_insensitively() {
        let index = StaticPageIndex::new();
        index.index(&[page("p1", "About"), page("p2", " "), page("p3", "contact")]);

        assert_eq!(index.page_id("about").as_deref(), Some("p1"));
        assert_eq!(index.page_id("CONTACT").as_deref(), Some("p3"));
        assert_eq!(index.len(), 2);

        index.clear();
        assert!(index.is_empty());
    }
}
