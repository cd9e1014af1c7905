/// Structured error type for rewear-core.
///
/// The server maps these into HTTP responses; the CLI wraps them in `anyhow`.
use thiserror::Error;

use crate::status::SwapStatus;

/// Main error type for rewear-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A status/type string that is not part of the vocabulary
    #[error("invalid {field} value: '{value}'")]
    UnknownVariant { field: &'static str, value: String },

    /// Swap status change not allowed by the transition table
    #[error("swap cannot move from {from} to {to}")]
    InvalidTransition { from: SwapStatus, to: SwapStatus },

    /// Balance does not cover a debit
    #[error("insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i32, available: i32 },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for rewear-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn unknown_variant(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field,
            value: value.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}
