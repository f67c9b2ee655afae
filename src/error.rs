// ⚠️ Error Taxonomy
// Two recoverable kinds: a rejected date range and a simulated network failure.
// Neither is fatal; both leave the displayed data untouched.

use chrono::NaiveDate;
use thiserror::Error;

/// Filter criteria rejected before dispatch (start date after end date).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("start date {date_from} must not be after end date {date_to}")]
pub struct ValidationError {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Randomly injected failure simulating network unreliability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transient failure: {message}")]
pub struct TransientError {
    pub message: String,
}

impl TransientError {
    pub fn network() -> Self {
        TransientError {
            message: "simulated network error".to_string(),
        }
    }
}

/// Everything a filter submission can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("invalid filters: {0}")]
    Validation(#[from] ValidationError),

    #[error("fetch failed: {0}")]
    Transient(#[from] TransientError),
}

impl SubmitError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::Validation(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SubmitError::Transient(_))
    }
}
