//! Domain layer types and invariants.

pub mod categories;
pub mod clock;
pub mod date;
pub mod entities;
pub mod error;
pub mod recency;
pub mod types;
