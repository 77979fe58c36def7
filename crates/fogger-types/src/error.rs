//! Error types for data parsing in fogger-types.

use thiserror::Error;

/// Errors that can occur when parsing persisted controller data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A stored motor status was neither `ON` nor `OFF`.
    #[error("Invalid motor status: {0:?} (expected \"ON\" or \"OFF\")")]
    InvalidStatus(String),

    /// A value was outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias using fogger-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
