//! Infrastructure adapters and runtime bootstrap.

pub mod audit;
pub mod clock;
pub mod error;
pub mod request_log;
pub mod search;
pub mod store;
pub mod telemetry;
