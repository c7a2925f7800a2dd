//! Audit trail of lifecycle events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::cache::lock::mutex_lock;
use crate::events::{
    EntryEvent, EntryListener, ListenerError, ResponseEvent, ResponseListener,
};

const SOURCE: &str = "archivist::infra::audit";

pub const DEFAULT_AUDIT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub epoch: u64,
    pub collection: String,
    pub kind: &'static str,
    pub subject_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Bounded, newest-last record of recent events. Oldest records fall off.
#[derive(Debug)]
pub struct AuditTrail {
    capacity: usize,
    records: Mutex<VecDeque<AuditRecord>>,
}

impl AuditTrail {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, record: AuditRecord) {
        info!(
            target: "archivist::audit",
            collection = %record.collection,
            kind = record.kind,
            subject_id = %record.subject_id,
            event_id = %record.event_id,
            epoch = record.epoch,
            "Lifecycle event"
        );
        let mut records = mutex_lock(&self.records, SOURCE, "record");
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Recorded events, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        mutex_lock(&self.records, SOURCE, "records")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.records, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

/// Built-in listener feeding the audit trail.
#[derive(Debug, Clone)]
pub struct AuditListener {
    trail: Arc<AuditTrail>,
}

impl AuditListener {
    pub fn new(trail: Arc<AuditTrail>) -> Self {
        Self { trail }
    }
}

#[async_trait]
impl EntryListener for AuditListener {
    fn name(&self) -> &str {
        "audit"
    }

    async fn on_entry_event(&self, event: &EntryEvent) -> Result<(), ListenerError> {
        self.trail.record(AuditRecord {
            event_id: event.id,
            epoch: event.epoch,
            collection: event.collection.clone(),
            kind: event.kind.as_str(),
            subject_id: event.kind.entry().id.clone(),
            at: event.timestamp,
        });
        Ok(())
    }
}

#[async_trait]
impl ResponseListener for AuditListener {
    fn name(&self) -> &str {
        "audit"
    }

    async fn on_response_event(&self, event: &ResponseEvent) -> Result<(), ListenerError> {
        self.trail.record(AuditRecord {
            event_id: event.id,
            epoch: event.epoch,
            collection: event.collection.clone(),
            kind: event.kind.as_str(),
            subject_id: event.kind.response().id.clone(),
            at: event.timestamp,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: &str) -> AuditRecord {
        AuditRecord {
            event_id: Uuid::new_v4(),
            epoch: 1,
            collection: "blog".to_string(),
            kind: "entry_created",
            subject_id: subject.to_string(),
            at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn ring_drops_oldest_records() {
        let trail = AuditTrail::new(2);
        trail.record(record("a"));
        trail.record(record("b"));
        trail.record(record("c"));

        let subjects: Vec<_> = trail
            .records()
            .into_iter()
            .map(|record| record.subject_id)
            .collect();
        assert_eq!(subjects, vec!["b", "c"]);
    }
}
