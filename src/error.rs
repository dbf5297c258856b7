//! Error taxonomy for the progress pipeline
//!
//! Validation and state errors are expected and carry enough context for the
//! caller to correct the request. Conflicts are retried internally first and
//! only surface once the retry budget is spent. Persistence errors abort the
//! whole sequence; the transaction guarantees no partial credit is left
//! behind.

use crate::domain::{Category, ProgressStatus};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("activity '{activity}' is not allowed for {} challenges (allowed: {})", category.as_str(), allowed.join(", "))]
    ActivityNotAllowed {
        activity: String,
        category: Category,
        allowed: Vec<&'static str>,
    },

    #[error("amount {amount} exceeds the per-update limit of {ceiling} for '{activity}'")]
    AmountOverCeiling {
        activity: String,
        amount: f64,
        ceiling: f64,
    },

    #[error("amount {amount} must be a positive number")]
    InvalidAmount { amount: f64 },

    #[error("challenge not found")]
    ChallengeNotFound,

    #[error("no progress for this challenge - join it first")]
    NotJoined,

    #[error("already joined this challenge")]
    AlreadyJoined,

    #[error("challenge already completed")]
    AlreadyCompleted,

    #[error("progress record is {}, no further updates accepted", status.as_str())]
    NotActive { status: ProgressStatus },

    #[error("progress was updated concurrently, please retry")]
    Conflict,

    #[error("achievement catalog has unknown requirement '{requirement}'")]
    BadCatalog { requirement: String },

    #[error("storage error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl EngineError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ActivityNotAllowed { .. } => "activity_not_allowed",
            Self::AmountOverCeiling { .. } => "amount_over_ceiling",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::ChallengeNotFound => "challenge_not_found",
            Self::NotJoined => "not_joined",
            Self::AlreadyJoined => "already_joined",
            Self::AlreadyCompleted => "already_completed",
            Self::NotActive { .. } => "not_active",
            Self::Conflict => "conflict",
            Self::BadCatalog { .. } => "bad_catalog",
            Self::Persistence(_) => "storage_error",
        }
    }

    /// HTTP status the error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ActivityNotAllowed { .. }
            | Self::AmountOverCeiling { .. }
            | Self::InvalidAmount { .. } => 400,
            Self::ChallengeNotFound | Self::NotJoined => 404,
            Self::AlreadyJoined | Self::AlreadyCompleted | Self::NotActive { .. } => 409,
            Self::Conflict => 503,
            Self::BadCatalog { .. } | Self::Persistence(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EngineError::InvalidAmount { amount: -1.0 }.http_status(),
            400
        );
        assert_eq!(EngineError::NotJoined.http_status(), 404);
        assert_eq!(EngineError::AlreadyCompleted.http_status(), 409);
        assert_eq!(EngineError::Conflict.http_status(), 503);
    }

    #[test]
    fn test_invalid_amount_echoes_value() {
        let err = EngineError::InvalidAmount { amount: -5.0 };
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn test_rejection_names_ceiling() {
        let err = EngineError::AmountOverCeiling {
            activity: "steps".into(),
            amount: 25000.0,
            ceiling: 20000.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000"));
        assert!(msg.contains("steps"));
    }
}
