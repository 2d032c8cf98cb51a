//! Shared Error Types
//!
//! This module defines the errors produced by the progress core: the record
//! model, the state machine and the merge engine. These are the only
//! failures the pure operations can report; everything else (a patch that
//! tries to rewrite a fixed timestamp, a stale remote record) is corrected
//! silently by the operations themselves.
//!
//! # Error Categories
//!
//! - `StageOutOfRange` - a stage index outside the configured layout
//! - `ValidationError` - malformed input such as an empty identity
//!
//! # Usage
//!
//! ```rust
//! use escape_progress::shared::error::ProgressError;
//!
//! let error = ProgressError::validation("identity", "team name cannot be empty");
//! assert!(error.to_string().contains("identity"));
//! ```

use thiserror::Error;

/// Errors reported by the progress core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// A stage index that is not part of the layout
    #[error("Stage {stage} is out of range (expected 1..={stage_count})")]
    StageOutOfRange {
        /// The rejected stage index
        stage: u32,
        /// Number of stages in the layout, terminal stage included
        stage_count: u32,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl ProgressError {
    /// Create a new out-of-range error
    pub fn stage_out_of_range(stage: u32, stage_count: u32) -> Self {
        Self::StageOutOfRange { stage, stage_count }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}
