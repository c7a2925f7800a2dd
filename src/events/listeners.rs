use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{SearchError, SearchIndex};
use crate::index::{EntryIndex, Indexes, ResponseIndex};

use super::{EntryEvent, EntryEventKind, ResponseEvent, ResponseEventKind};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener `{listener}` failed: {message}")]
    Failed { listener: String, message: String },
    #[error("listener `{listener}` panicked: {message}")]
    Panicked { listener: String, message: String },
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ListenerError {
    pub fn failed(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait EntryListener: Send + Sync {
    fn name(&self) -> &str;

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError>;
}

#[async_trait]
pub trait ResponseListener: Send + Sync {
    fn name(&self) -> &str;

    async fn on_response_event(&self, event: &ResponseEvent) -> Result<(), ListenerError>;
}

/// Keeps one entry-classifying index in step with entry events.
pub struct EntryIndexListener {
    index: Arc<dyn EntryIndex>,
}

impl EntryIndexListener {
    pub fn new(index: Arc<dyn EntryIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl EntryListener for EntryIndexListener {
    fn name(&self) -> &str {
        self.index.name()
    }

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError> {
        match &event.kind {
            EntryEventKind::Created(entry) => self.index.add(entry),
            EntryEventKind::Updated { previous, current } => self.index.update(previous, current),
            EntryEventKind::Deleted(entry) => self.index.remove(entry),
        }
        Ok(())
    }
}

/// Keeps the response index in step with response events, and drops an
/// entry's responses when the entry is deleted.
pub struct ResponseIndexListener {
    index: Arc<ResponseIndex>,
}

impl ResponseIndexListener {
    pub fn new(index: Arc<ResponseIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl ResponseListener for ResponseIndexListener {
    fn name(&self) -> &str {
        "responses"
    }

    async fn on_response_event(&self, event: &ResponseEvent) -> Result<(), ListenerError> {
        match &event.kind {
            ResponseEventKind::Created(response) => self.index.add(response),
            ResponseEventKind::Moderated { previous, current } => {
                self.index.moderate(previous, current)
            }
            ResponseEventKind::Deleted(response) => {
                self.index.remove(response);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntryListener for ResponseIndexListener {
    fn name(&self) -> &str {
        "responses"
    }

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError> {
        if let EntryEventKind::Deleted(entry) = &event.kind {
            let removed = self.index.remove_for_entry(&entry.id);
            if !removed.is_empty() {
                debug!(entry_id = %entry.id, responses = removed.len(), "Dropped responses of deleted entry");
            }
        }
        Ok(())
    }
}

/// Forwards entry events to the full-text search engine.
pub struct SearchIndexListener {
    search: Arc<dyn SearchIndex>,
}

impl SearchIndexListener {
    pub fn new(search: Arc<dyn SearchIndex>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl EntryListener for SearchIndexListener {
    fn name(&self) -> &str {
        "search"
    }

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError> {
        match &event.kind {
            EntryEventKind::Created(entry) => self.search.add_entry(entry).await?,
            EntryEventKind::Updated { previous, current } => {
                self.search.update_entry(previous, current).await?
            }
            EntryEventKind::Deleted(entry) => self.search.remove_entry(&entry.id).await?,
        }
        Ok(())
    }
}

/// Logs every lifecycle event at `debug`.
#[derive(Debug, Clone)]
pub struct TraceListener {
    collection: String,
}

impl TraceListener {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl EntryListener for TraceListener {
    fn name(&self) -> &str {
        "trace"
    }

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError> {
        debug!(
            collection = %self.collection,
            event_id = %event.id,
            epoch = event.epoch,
            kind = event.kind.as_str(),
            entry_id = %event.kind.entry().id,
            "Entry event"
        );
        Ok(())
    }
}

#[async_trait]
impl ResponseListener for TraceListener {
    fn name(&self) -> &str {
        "trace"
    }

    async fn on_response_event(&self, event: &ResponseEvent) -> Result<(), ListenerError> {
        let response = event.kind.response();
        debug!(
            collection = %self.collection,
            event_id = %event.id,
            epoch = event.epoch,
            kind = event.kind.as_str(),
            response_id = %response.id,
            entry_id = %response.entry_id,
            "Response event"
        );
        Ok(())
    }
}

/// Ordered listener handles, fixed when a collection is built.
#[derive(Clone, Default)]
pub struct ListenerSet {
    entry: Vec<Arc<dyn EntryListener>>,
    response: Vec<Arc<dyn ResponseListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index and search listeners every collection runs.
    pub fn builtin(indexes: &Indexes, search: Arc<dyn SearchIndex>) -> Self {
        let responses = Arc::new(ResponseIndexListener::new(Arc::clone(&indexes.responses)));
        let mut set = Self::new();
        for index in indexes.entry_indexes() {
            set = set.with_entry(Arc::new(EntryIndexListener::new(index)));
        }
        set.with_entry(Arc::clone(&responses) as Arc<dyn EntryListener>)
            .with_entry(Arc::new(SearchIndexListener::new(search)))
            .with_response(responses)
    }

    pub fn with_entry(mut self, listener: Arc<dyn EntryListener>) -> Self {
        self.entry.push(listener);
        self
    }

    pub fn with_response(mut self, listener: Arc<dyn ResponseListener>) -> Self {
        self.response.push(listener);
        self
    }

    /// Append `other`'s listeners after this set's.
    pub fn then(mut self, other: ListenerSet) -> Self {
        self.entry.extend(other.entry);
        self.response.extend(other.response);
        self
    }

    pub fn entry_listeners(&self) -> &[Arc<dyn EntryListener>] {
        &self.entry
    }

    pub fn response_listeners(&self) -> &[Arc<dyn ResponseListener>] {
        &self.response
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field(
                "entry",
                &self.entry.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .field(
                "response",
                &self.response.iter().map(|l| l.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
