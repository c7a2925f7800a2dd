//! Secondary indexes, reindexing and date archive navigation for blog content collections.

pub mod application;
pub mod archive;
pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod index;
pub mod infra;
