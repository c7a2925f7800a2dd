//! Shared domain enumerations for entry and response lifecycle state.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Published,
    Unpublished,
}

impl EntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Published => "published",
            EntryState::Unpublished => "unpublished",
        }
    }

    pub fn is_published(self) -> bool {
        matches!(self, EntryState::Published)
    }
}

/// Moderation state of a comment or trackback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Approved,
    Pending,
    Rejected,
}

impl ModerationState {
    pub const ALL: [ModerationState; 3] = [
        ModerationState::Approved,
        ModerationState::Pending,
        ModerationState::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModerationState::Approved => "approved",
            ModerationState::Pending => "pending",
            ModerationState::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Comment,
    TrackBack,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseKind::Comment => "comment",
            ResponseKind::TrackBack => "trackback",
        }
    }
}

impl TryFrom<&str> for ModerationState {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "approved" => Ok(ModerationState::Approved),
            "pending" => Ok(ModerationState::Pending),
            "rejected" => Ok(ModerationState::Rejected),
            other => Err(DomainError::UnknownVariant {
                kind: "moderation state",
                value: other.to_string(),
            }),
        }
    }
}
