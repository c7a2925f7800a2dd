use std::error::Error as StdError;

use thiserror::Error;

use crate::application::repos::RepoError;
use crate::config::LoadError;
use crate::domain::error::DomainError;
use crate::events::{RegistryError, ReindexError};
use crate::infra::error::InfraError;

/// Error message chain of `error`, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Reindex(#[from] ReindexError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Registry(_) => 2,
            AppError::Domain(err) if err.is_validation() => 2,
            AppError::Reindex(_) | AppError::Repo(_) => 3,
            AppError::Domain(_) | AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
