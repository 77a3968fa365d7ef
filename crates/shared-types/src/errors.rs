//! # Error Types
//!
//! Stateless validation and encoding errors for the transaction model.

use thiserror::Error;

/// A message or fee failed its stateless sanity checks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required address field is the zero address.
    #[error("Empty address in field `{0}`")]
    EmptyAddress(&'static str),

    /// Coin amounts are zero, unsorted, duplicated or carry a bad denom.
    #[error("Invalid coins: {0}")]
    InvalidCoins(String),

    /// A message-specific field is malformed.
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Nested authorization execution is deeper than allowed.
    #[error("Message nesting exceeds depth {0}")]
    NestingTooDeep(usize),
}

/// Canonical encoding of a transaction component failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Encoding failed: {0}")]
pub struct EncodingError(pub String);

impl From<bincode::Error> for EncodingError {
    fn from(err: bincode::Error) -> Self {
        EncodingError(err.to_string())
    }
}

impl From<serde_json::Error> for EncodingError {
    fn from(err: serde_json::Error) -> Self {
        EncodingError(err.to_string())
    }
}
