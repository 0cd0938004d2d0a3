//! Error types for record parsing and aggregation

use crate::common::PageId;
use thiserror::Error;

/// Record parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A structurally invalid input line
    #[error("Malformed record {line:?}: {reason}")]
    Malformed {
        /// The offending raw line
        line: String,
        /// Why it was rejected
        reason: String,
    },
}

impl RecordError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        RecordError::Malformed {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Aggregation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// Damping factor outside [0, 1] or not finite
    #[error("Damping factor must be within [0, 1], got {0}")]
    InvalidDampingFactor(f64),

    /// A source has outbound edges but no prior rank (strict policy only)
    #[error("No prior rank for source page {0}")]
    MissingRank(PageId),

    /// The run was cancelled at a group boundary
    #[error("Aggregation cancelled")]
    Cancelled,
}

pub type AggregateResult<T> = Result<T, AggregateError>;
