use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use tracing::debug;

use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::Response;
use crate::domain::recency::RecencyList;
use crate::domain::types::ModerationState;

const SOURCE: &str = "archivist::index::responses";

#[derive(Debug, Default)]
struct Moderation {
    approved: RecencyList,
    pending: RecencyList,
    rejected: RecencyList,
    by_entry: BTreeMap<String, BTreeSet<String>>,
}

impl Moderation {
    fn bucket(&self, state: ModerationState) -> &RecencyList {
        match state {
            ModerationState::Approved => &self.approved,
            ModerationState::Pending => &self.pending,
            ModerationState::Rejected => &self.rejected,
        }
    }

    fn bucket_mut(&mut self, state: ModerationState) -> &mut RecencyList {
        match state {
            ModerationState::Approved => &mut self.approved,
            ModerationState::Pending => &mut self.pending,
            ModerationState::Rejected => &mut self.rejected,
        }
    }

    fn insert(&mut self, response: &Response) {
        self.unlink(&response.id);
        self.bucket_mut(response.state)
            .insert(&response.id, response.date);
        self.by_entry
            .entry(response.entry_id.clone())
            .or_default()
            .insert(response.id.clone());
    }

    fn unlink(&mut self, id: &str) -> bool {
        let mut found = false;
        for state in ModerationState::ALL {
            found |= self.bucket_mut(state).remove(id);
        }
        self.by_entry.retain(|_, ids| {
            found |= ids.remove(id);
            !ids.is_empty()
        });
        found
    }
}

/// Responses (comments and trackbacks) bucketed by moderation state.
#[derive(Debug, Default)]
pub struct ResponseIndex {
    moderation: RwLock<Moderation>,
}

impl ResponseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, responses: &[Response]) {
        let mut fresh = Moderation::default();
        for response in responses {
            fresh.insert(response);
        }
        let total = fresh.by_entry.values().map(BTreeSet::len).sum::<usize>();
        *rw_write(&self.moderation, SOURCE, "index") = fresh;
        debug!(responses = total, "Response buckets rebuilt");
    }

    pub fn clear(&self) {
        *rw_write(&self.moderation, SOURCE, "clear") = Moderation::default();
    }

    pub fn add(&self, response: &Response) {
        rw_write(&self.moderation, SOURCE, "add").insert(response);
        debug!(
            response_id = %response.id,
            entry_id = %response.entry_id,
            state = response.state.as_str(),
            "Response indexed"
        );
    }

    /// Move a response to the bucket of its new moderation state.
    pub fn moderate(&self, previous: &Response, current: &Response) {
        let mut moderation = rw_write(&self.moderation, SOURCE, "moderate");
        moderation.unlink(&previous.id);
        moderation.insert(current);
        debug!(
            response_id = %current.id,
            from = previous.state.as_str(),
            to = current.state.as_str(),
            "Response moderated"
        );
    }

    pub fn remove(&self, response: &Response) -> bool {
        rw_write(&self.moderation, SOURCE, "remove").unlink(&response.id)
    }

    /// Drop every response attached to `entry_id`, returning their ids.
    pub fn remove_for_entry(&self, entry_id: &str) -> Vec<String> {
        let mut moderation = rw_write(&self.moderation, SOURCE, "remove_for_entry");
        let Some(ids) = moderation.by_entry.remove(entry_id) else {
            return Vec::new();
        };
        for id in &ids {
            moderation.unlink(id);
        }
        ids.into_iter().collect()
    }

    pub fn responses(&self, state: ModerationState) -> Vec<String> {
        rw_read(&self.moderation, SOURCE, "responses")
            .bucket(state)
            .ids()
    }

    pub fn approved(&self) -> Vec<String> {
        self.responses(ModerationState::Approved)
    }

    pub fn pending(&self) -> Vec<String> {
        self.responses(ModerationState::Pending)
    }

    pub fn rejected(&self) -> Vec<String> {
        self.responses(ModerationState::Rejected)
    }

    pub fn recent_approved(&self, limit: usize) -> Vec<String> {
        rw_read(&self.moderation, SOURCE, "recent_approved")
            .approved
            .iter()
            .take(limit)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn number_of_responses(&self, state: ModerationState) -> usize {
        rw_read(&self.moderation, SOURCE, "count").bucket(state).len()
    }

    pub fn number_of_approved(&self) -> usize {
        self.number_of_responses(ModerationState::Approved)
    }

    pub fn number_of_pending(&self) -> usize {
        self.number_of_responses(ModerationState::Pending)
    }

    pub fn number_of_rejected(&self) -> usize {
        self.number_of_responses(ModerationState::Rejected)
    }

    pub fn for_entry(&self, entry_id: &str) -> Vec<String> {
        rw_read(&self.moderation, SOURCE, "for_entry")
            .by_entry
            .get(entry_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Vec<String>> {
        let moderation = rw_read(&self.moderation, SOURCE, "snapshot");
        ModerationState::ALL
            .into_iter()
            .map(|state| (state.as_str().to_string(), moderation.bucket(state).ids()))
            .collect()
    }
}
