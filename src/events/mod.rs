//! Lifecycle events and the listeners that keep derived state in step with them.
//!
//! A content collection raises one event per entry or response change. The
//! [`IndexCoordinator`] hands each event to every listener in order and awaits
//! them all before the write returns, so indexes are caught up when the
//! caller regains control.

mod coordinator;
mod listeners;
mod registry;

use time::OffsetDateTime;
use uuid::Uuid;

pub use coordinator::{
    DispatchReport, IndexCoordinator, ListenerFailure, ReindexError, ReindexStage,
    ReindexSummary,
};
pub use listeners::{
    EntryIndexListener, EntryListener, ListenerError, ListenerSet, ResponseIndexListener,
    ResponseListener, SearchIndexListener, TraceListener,
};
pub use registry::{
    EntryListenerFactory, ListenerRegistry, PluginContext, RegistryError,
    ResponseListenerFactory, TRACE_PLUGIN,
};

use crate::domain::entities::{Entry, Response};

/// Monotonic per-collection sequence number.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct EntryEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub collection: String,
    pub kind: EntryEventKind,
    pub timestamp: OffsetDateTime,
}

impl EntryEvent {
    pub fn new(collection: impl Into<String>, kind: EntryEventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            collection: collection.into(),
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEventKind {
    Created(Entry),
    /// Any edit, including publish and unpublish.
    Updated {
        previous: Entry,
        current: Entry,
    },
    Deleted(Entry),
}

impl EntryEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryEventKind::Created(_) => "entry_created",
            EntryEventKind::Updated { .. } => "entry_updated",
            EntryEventKind::Deleted(_) => "entry_deleted",
        }
    }

    /// The entry as it stands after the event (the removed entry for deletions).
    pub fn entry(&self) -> &Entry {
        match self {
            EntryEventKind::Created(entry) | EntryEventKind::Deleted(entry) => entry,
            EntryEventKind::Updated { current, .. } => current,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub collection: String,
    pub kind: ResponseEventKind,
    pub timestamp: OffsetDateTime,
}

impl ResponseEvent {
    pub fn new(collection: impl Into<String>, kind: ResponseEventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            collection: collection.into(),
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEventKind {
    Created(Response),
    Moderated {
        previous: Response,
        current: Response,
    },
    Deleted(Response),
}

impl ResponseEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseEventKind::Created(_) => "response_created",
            ResponseEventKind::Moderated { .. } => "response_moderated",
            ResponseEventKind::Deleted(_) => "response_deleted",
        }
    }

    pub fn response(&self) -> &Response {
        match self {
            ResponseEventKind::Created(response) | ResponseEventKind::Deleted(response) => {
                response
            }
            ResponseEventKind::Moderated { current, .. } => current,
        }
    }
}
