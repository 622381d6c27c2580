//! Error types for the postsolve stack.

use thiserror::Error;

/// Errors surfaced while recording or replaying reductions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostsolveError {
    /// The solution handed to `undo` is not sized like the reduced problem
    /// tracked by the index maps.
    #[error(
        "solution sized {rows} rows x {cols} cols does not match the reduced \
         problem sized {expected_rows} rows x {expected_cols} cols"
    )]
    SizeMismatch {
        /// Reduced row count tracked by the index maps
        expected_rows: usize,
        /// Reduced column count tracked by the index maps
        expected_cols: usize,
        /// Row count of the solution passed in
        rows: usize,
        /// Column count of the solution passed in
        cols: usize,
    },

    /// A pop would read past the recorded content. The tag sequence and the
    /// arena disagree, which means emission and replay were not paired
    /// correctly by the caller.
    #[error("reduction arena underflow: {requested} bytes requested, {available} available")]
    ArenaUnderflow {
        /// Bytes the pop needed
        requested: usize,
        /// Bytes left in front of the read cursor
        available: usize,
    },

    /// An input or intermediate value violated a documented precondition,
    /// e.g. a zero pivot coefficient or a non-finite fix value. These
    /// indicate presolver bugs; partial postsolve results must be discarded.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

/// Result type for postsolve operations.
pub type PostsolveResult<T> = Result<T, PostsolveError>;
