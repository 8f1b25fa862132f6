//! Error types for capmesh.

use thiserror::Error;

/// Result type alias for capmesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running a capacity-mesh solve.
#[derive(Debug, Error)]
pub enum Error {
    /// The board description is invalid (zero-area bounds, bad outline, ...).
    #[error("Invalid board: {0}")]
    InvalidBoard(String),

    /// A layer name or index falls outside the board's layer stack.
    #[error("Invalid layer: {0}")]
    InvalidLayer(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// `solve` ran out of its safety iteration budget before reaching DONE.
    #[error("Iteration limit exceeded after {0} steps")]
    IterationLimit(usize),

    /// Internal error (invariant breakage, programming error).
    #[error("Internal error: {0}")]
    Internal(String),
}
