use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{value}` is not a valid calendar date: {reason}")]
    InvalidDate { value: String, reason: String },
    #[error("invalid category path `{path}`: {reason}")]
    InvalidCategory { path: String, reason: String },
    #[error("unknown {kind} `{value}`")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("the root category cannot be removed")]
    RootCategory,
}

impl DomainError {
    pub fn invalid_date(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_category(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCategory {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether the error stems from malformed input rather than missing state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidDate { .. } | Self::InvalidCategory { .. } | Self::UnknownVariant { .. }
        )
    }
}
