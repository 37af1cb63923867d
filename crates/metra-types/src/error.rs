//! Error types for parsing in metra-types.

use thiserror::Error;

/// Errors that can occur when parsing addresses or category names.
///
/// This error type is platform-agnostic and does not include storage
/// errors (those belong in metra-store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The path does not match any recognized resource address shape.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Unrecognized metric group category name.
    #[error("Unknown group kind: {0}")]
    UnknownKind(String),
}

/// Result type alias using metra-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
