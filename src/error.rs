//! Driver errors

use crate::config::ConfigError;
use rankstep_core::{AggregateError, RecordError};
use thiserror::Error;

/// Errors that fail an iteration step
#[derive(Error, Debug)]
pub enum JobError {
    /// Reading an input or writing the output failed
    #[error("I/O error on {input}: {source}")]
    Io {
        input: String,
        source: std::io::Error,
    },

    /// A structurally invalid input line; the whole iteration is aborted
    #[error("{input}:{line_number}: {source}")]
    Malformed {
        input: String,
        /// 1-based line number
        line_number: usize,
        source: RecordError,
    },

    /// Aggregation failed or was cancelled
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl JobError {
    pub(crate) fn io(input: impl Into<String>, source: std::io::Error) -> Self {
        JobError::Io {
            input: input.into(),
            source,
        }
    }

    /// True when the run stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobError::Aggregate(AggregateError::Cancelled))
    }
}

pub type JobResult<T> = Result<T, JobError>;
