use thiserror::Error;

/// Errors raised while choosing markers
///
/// Degenerate inputs (no rows, no columns, no groups, zero requested
/// markers) are not errors and yield empty results instead.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// A product of sizes does not fit into `usize`.
    #[error("Size overflow when computing {context}: {left} x {right}")]
    SizeOverflow {
        context: &'static str,
        left: usize,
        right: usize,
    },

    /// A per-sample assignment does not match the number of matrix columns.
    #[error("Length of {what} ({actual}) does not match the number of columns ({expected})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The rayon pool for the row scan could not be constructed.
    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A parameter outside of its permitted range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, MarkerError>;
