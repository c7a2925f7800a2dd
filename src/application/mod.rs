//! Application services: the content collection and its collaborator seams.

pub mod collection;
pub mod error;
pub mod repos;
