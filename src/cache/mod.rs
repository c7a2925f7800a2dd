//! Shared-state primitives for content collections.
//!
//! - [`MemoizedCache`]: per-key derived values computed at most once
//! - lock helpers that recover poisoned `std::sync` locks and log the recovery

pub(crate) mod lock;
mod memo;

pub use memo::{MemoError, MemoizedCache};
