//! Errors raised by the report engine.
//!
//! Only structurally unsatisfiable requests surface as [`EngineError`].
//! Unresolved roles and lossy numeric coercion are reported as
//! [`crate::diagnostics::Diagnostic`] events instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Invalid date '{value}': {reason}")]
    InvalidDateFormat { value: String, reason: String },
    #[error("No grouping columns available: every requested group-by role is unresolved")]
    NoGroupingColumnsAvailable,
    #[error("No measure column: the measure role is unresolved")]
    NoMeasureColumn,
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Invalid filter expression: {0}")]
    InvalidFilter(String),
}

impl EngineError {
    pub(crate) fn invalid_date(value: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidDateFormat {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
