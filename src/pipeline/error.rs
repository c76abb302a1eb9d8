//! Pipeline-specific outcome and error types.
//!
//! A line that does not make it to the broker is either *skipped*
//! ([`SkipReason`], an expected outcome) or hits a *fault*
//! ([`PipelineError`], unexpected; logged and followed by a back-off).

use thiserror::Error;

/// Why a decoder line was dropped without publishing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("field {index} ({name}) is not an integer: '{value}'")]
    NonNumeric {
        index: usize,
        name: &'static str,
        value: String,
    },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("meter {0} is not watched")]
    Unwatched(u32),

    #[error("meter {meter_id} interval {interval_id} already published")]
    DuplicateInterval { meter_id: u32, interval_id: u32 },
}

/// Unexpected failures inside one loop iteration.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metric overflow for meter {meter_id}: {message}")]
    Overflow { meter_id: u32, message: String },
}

impl PipelineError {
    /// Short category name used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Io(_) => "io",
            PipelineError::Overflow { .. } => "overflow",
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
