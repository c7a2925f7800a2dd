//! Category hierarchy addressed by slash-separated paths (`/`, `/tech`, `/tech/rust`).

use std::collections::BTreeMap;

use super::error::DomainError;

pub const ROOT_CATEGORY: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct CategoryTree {
    names: BTreeMap<String, String>,
}

impl Default for CategoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree {
    pub fn new() -> Self {
        let mut names = BTreeMap::new();
        names.insert(ROOT_CATEGORY.to_string(), "All".to_string());
        Self { names }
    }

    pub fn contains(&self, id: &str) -> bool {
        normalize_category_id(id).is_ok_and(|id| self.names.contains_key(&id))
    }

    pub fn get(&self, id: &str) -> Option<Category> {
        let id = normalize_category_id(id).ok()?;
        self.names.get(&id).map(|name| Category {
            depth: depth_of(&id),
            id,
            name: name.clone(),
        })
    }

    /// Add a category, creating any missing ancestors.
    ///
    /// Returns false when the category already existed.
    pub fn add(&mut self, id: &str, name: &str) -> Result<bool, DomainError> {
        let id = normalize_category_id(id)?;
        if self.names.contains_key(&id) {
            return Ok(false);
        }

        let mut ancestor = parent_of(&id);
        while let Some(path) = ancestor {
            if self.names.contains_key(path) {
                break;
            }
            self.names
                .insert(path.to_string(), last_segment(path).to_string());
            ancestor = parent_of(path);
        }

        let name = name.trim();
        let name = if name.is_empty() {
            last_segment(&id).to_string()
        } else {
            name.to_string()
        };
        self.names.insert(id, name);
        Ok(true)
    }

    /// Remove a category and its whole subtree, returning the removed ids.
    pub fn remove(&mut self, id: &str) -> Result<Vec<String>, DomainError> {
        let id = normalize_category_id(id)?;
        if id == ROOT_CATEGORY {
            return Err(DomainError::RootCategory);
        }
        if !self.names.contains_key(&id) {
            return Err(DomainError::not_found("category", id));
        }

        let removed = self.descendants(&id);
        for path in &removed {
            self.names.remove(path);
        }
        Ok(removed)
    }

    /// The category itself followed by every category beneath it.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let Ok(id) = normalize_category_id(id) else {
            return Vec::new();
        };
        if !self.names.contains_key(&id) {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.walk(&id, &mut out);
        out
    }

    /// Depth-first listing starting at the root.
    pub fn list(&self) -> Vec<Category> {
        self.descendants(ROOT_CATEGORY)
            .into_iter()
            .filter_map(|id| self.get(&id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.len() <= 1
    }

    fn walk(&self, id: &str, out: &mut Vec<String>) {
        out.push(id.to_string());
        let children: Vec<&String> = self
            .names
            .keys()
            .filter(|candidate| parent_of(candidate) == Some(id))
            .collect();
        for child in children {
            self.walk(child, out);
        }
    }
}

/// Canonical form of a category path: leading slash, no empty segments, no trailing slash.
pub fn normalize_category_id(raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(DomainError::invalid_category(raw, "must start with `/`"));
    }
    let segments: Vec<&str> = trimmed
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return Ok(ROOT_CATEGORY.to_string());
    }
    Ok(format!("/{}", segments.join("/")))
}

fn parent_of(id: &str) -> Option<&str> {
    if id == ROOT_CATEGORY {
        return None;
    }
    match id.rfind('/') {
        Some(0) => Some(ROOT_CATEGORY),
        Some(index) => Some(&id[..index]),
        None => None,
    }
}

fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn depth_of(id: &str) -> usize {
    if id == ROOT_CATEGORY {
        0
    } else {
        id.matches('/').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_creates_ancestors() {
        let mut tree = CategoryTree::new();
        assert!(tree.add("/tech/rust/async", "Async").expect("valid id"));

        assert!(tree.contains("/tech"));
        assert!(tree.contains("/tech/rust"));
        assert_eq!(tree.get("/tech/rust/async").map(|c| c.name), Some("Async".into()));
        assert_eq!(tree.get("/tech").map(|c| c.name), Some("tech".into()));
        assert!(!tree.add("/tech/", "Again").expect("valid id"));
    }

    #[test]
    fn listing_is_depth_first() {
        let mut tree = CategoryTree::new();
        tree.add("/b", "B").expect("valid id");
        tree.add("/a/y", "Y").expect("valid id");
        tree.add("/a-z", "AZ").expect("valid id");

        let ids: Vec<String> = tree.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["/", "/a", "/a/y", "/a-z", "/b"]);
    }

    #[test]
    fn remove_takes_subtree() {
        let mut tree = CategoryTree::new();
        tree.add("/tech/rust", "Rust").expect("valid id");
        tree.add("/tech/go", "Go").expect("valid id");
        tree.add("/life", "Life").expect("valid id");

        let removed = tree.remove("/tech").expect("category exists");
        assert_eq!(removed.len(), 3);
        assert!(!tree.contains("/tech/go"));
        assert!(tree.contains("/life"));
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = CategoryTree::new();
        assert!(matches!(
            tree.remove("/"),
            Err(DomainError::RootCategory)
        ));
        assert!(matches!(
            tree.remove("/missing"),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn rejects_relative_ids() {
        assert!(normalize_category_id("tech").is_err());
        assert_eq!(
            normalize_category_id(" /tech//rust/ ").expect("valid id"),
            "/tech/rust"
        );
    }
}
