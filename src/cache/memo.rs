//! Per-key memoized values with at-most-once computation.
//!
//! Each key maps to a shared once-cell. The cell is inserted with an atomic
//! check-and-insert on the map and the computation runs inside the cell, so
//! concurrent first callers for a key all wait on the same computation and
//! receive the same `Arc`. A computation that fails leaves the cell empty:
//! the error goes to the caller and the next call for that key retries.

use std::any::{Any, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use metrics::gauge;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, warn};

const METRIC_MEMO_ENTRIES: &str = "archivist_memo_entries";

type Value = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Value>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoError {
    #[error("memoized value `{key}` is not a `{expected}`")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Memoized derived values for one content collection.
///
/// There is no eviction and no expiry; values live until [`MemoizedCache::reset`].
pub struct MemoizedCache {
    scope: String,
    slots: DashMap<String, Slot>,
}

impl MemoizedCache {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            slots: DashMap::new(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Return the value for `key`, computing it with `compute` if absent.
    pub fn get_or_compute<T, F>(&self, key: &str, compute: F) -> Result<Arc<T>, MemoError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        self.try_get_or_compute::<T, MemoError, _>(key, || Ok(compute()))
    }

    /// Fallible variant of [`MemoizedCache::get_or_compute`].
    ///
    /// An error from `compute` is returned to this caller only; nothing is
    /// cached for `key` and the next call runs the computation again.
    pub fn try_get_or_compute<T, E, F>(&self, key: &str, compute: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        E: From<MemoError>,
        F: FnOnce() -> Result<T, E>,
    {
        let slot: Slot = self.slots.entry(key.to_string()).or_default().clone();
        let value = slot.get_or_try_init(|| {
            debug!(scope = %self.scope, key, "Computing memoized value");
            compute().map(|value| Arc::new(value) as Value)
        })?;
        gauge!(METRIC_MEMO_ENTRIES, "scope" => self.scope.clone()).set(self.slots.len() as f64);

        Arc::clone(value).downcast::<T>().map_err(|_| {
            warn!(
                scope = %self.scope,
                key,
                expected = type_name::<T>(),
                "Memoized value has an unexpected type"
            );
            E::from(MemoError::TypeMismatch {
                key: key.to_string(),
                expected: type_name::<T>(),
            })
        })
    }

    /// Drop the value for `key` so the next access recomputes it.
    ///
    /// Callers already waiting on an in-flight computation still receive its result.
    pub fn reset(&self, key: &str) -> bool {
        let removed = self.slots.remove(key).is_some();
        if removed {
            debug!(scope = %self.scope, key, "Memoized value reset");
        }
        removed
    }

    pub fn reset_all(&self) {
        self.slots.clear();
    }

    /// Whether a computed value is currently held for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
