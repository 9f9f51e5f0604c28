//! Error types for ray batches and build configuration.

use thiserror::Error;

/// Errors detected when validating a [`RayBatch`](crate::RayBatch).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// Two per-ray arrays of the batch have different lengths.
    #[error("{what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        /// Which array is off.
        what: &'static str,
        /// Number of rays implied by the batch.
        expected: usize,
        /// Length of the offending array.
        actual: usize,
    },

    /// A ray has a NaN or infinite origin/direction, or a NaN range bound.
    #[error("ray {index} has a non-finite {what}")]
    NonFinite {
        /// Index of the offending ray.
        index: usize,
        /// Which component is invalid.
        what: &'static str,
    },
}

/// Error returned when parsing an unknown quality level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown build quality {0:?}, expected \"low\", \"medium\" or \"high\"")]
pub struct ParseQualityError(pub String);

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;
