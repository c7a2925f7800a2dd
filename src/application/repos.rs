//! Collaborator traits the content collection is built against.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Entry, Response, StaticPage};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("collection `{collection}` not found")]
    UnknownCollection { collection: String },
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

/// Source of truth for a collection's content.
///
/// Every load returns the complete current state; paginated or partial
/// loads are not part of the contract.
#[async_trait]
pub trait CanonicalStore: Send + Sync {
    async fn load_all_entries(&self, collection: &str) -> Result<Vec<Entry>, RepoError>;

    async fn load_all_responses(&self, collection: &str) -> Result<Vec<Response>, RepoError>;

    async fn load_static_pages(&self, _collection: &str) -> Result<Vec<StaticPage>, RepoError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search engine unavailable: {0}")]
    Unavailable(String),
    #[error("search document `{id}` rejected: {message}")]
    Rejected { id: String, message: String },
}

impl SearchError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn rejected(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Full-text search engine fed by the coordinator.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_entries(&self, entries: &[Entry]) -> Result<(), SearchError>;

    async fn index_static_pages(&self, pages: &[StaticPage]) -> Result<(), SearchError>;

    async fn clear(&self) -> Result<(), SearchError>;

    async fn add_entry(&self, entry: &Entry) -> Result<(), SearchError>;

    /// Engines without an update primitive get remove followed by add.
    async fn update_entry(&self, previous: &Entry, current: &Entry) -> Result<(), SearchError> {
        self.remove_entry(&previous.id).await?;
        self.add_entry(current).await
    }

    async fn remove_entry(&self, id: &str) -> Result<(), SearchError>;
}
