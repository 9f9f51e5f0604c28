//! Error types for geometry construction and merging.

use thiserror::Error;

/// Errors that can occur while building or merging a [`GeometryStore`](crate::GeometryStore).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        /// Id of the offending triangle.
        triangle: usize,
        /// The out-of-range vertex index.
        index: u32,
        /// Number of vertices in the store.
        vertex_count: usize,
    },

    /// A vertex has a NaN or infinite coordinate.
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFiniteVertex {
        /// Id of the offending vertex.
        vertex: usize,
    },

    /// A flat buffer length is not a multiple of three.
    #[error("{buffer} buffer has length {len}, expected a multiple of 3")]
    LengthMismatch {
        /// Which buffer was malformed.
        buffer: &'static str,
        /// Its length.
        len: usize,
    },

    /// The vertex count no longer fits the `u32` index type.
    #[error("vertex count {0} exceeds the u32 index range")]
    TooManyVertices(usize),
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
