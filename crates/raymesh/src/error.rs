//! Error types for mesh queries.

use raymesh_bvh::{BatchError, ParseQualityError};
use raymesh_geom::GeometryError;
use thiserror::Error;

/// Errors returned by [`Mesh`](crate::Mesh) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Vertex or index buffers are malformed.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryError),

    /// A ray batch is malformed.
    #[error("invalid rays: {0}")]
    InvalidRays(#[from] BatchError),

    /// A build configuration value is out of range or unparseable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A query was issued before the first build.
    #[error("acceleration structure has not been built")]
    NotBuilt,

    /// Geometry was merged after the last build.
    #[error("acceleration structure is stale, rebuild after merging")]
    Stale,
}

impl From<ParseQualityError> for MeshError {
    fn from(err: ParseQualityError) -> Self {
        MeshError::InvalidConfig(err.to_string())
    }
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
