//! Error types for sigbridge-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Unrecognized signal: {0:?}")]
    UnrecognizedSignal(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
