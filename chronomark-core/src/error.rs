//! Error types for Chronomark core operations

use thiserror::Error;

/// Timestamp conversion errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid RFC3339 timestamp '{input}': {reason}")]
    InvalidRfc3339 { input: String, reason: String },

    #[error("Timestamp out of range: {ms}ms")]
    OutOfRange { ms: i64 },

    #[error("Timestamp is not finite: {value}")]
    NotFinite { value: String },
}

/// Editor validation errors. The display strings are shown next to the
/// offending form field.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyText,

    #[error("Not a valid date")]
    BadDateTime,

    #[error("End date must be after start date")]
    EndBeforeStart,

    #[error("Duplicate label")]
    DuplicateLabel,
}

/// Error when parsing an invalid tag filter operator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid tag filter type: {0}")]
pub struct TagFilterTypeParseError(pub String);

/// Master error type for core operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Time error: {0}")]
    Time(#[from] TimeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    TagFilterType(#[from] TagFilterTypeParseError),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
