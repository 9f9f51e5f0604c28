#![warn(missing_docs)]

//! raymesh: fast ray queries against triangle meshes.
//!
//! Wraps a validated [`GeometryStore`] and a [`Bvh`] built over it behind a
//! single [`Mesh`] type. Closest-hit, occlusion and candidate enumeration
//! queries are available for single rays and for [`RayBatch`]es, which are
//! answered in parallel.
//!
//! # Example
//!
//! ```
//! use raymesh::{BuildConfig, Mesh, Point3, Quality, RayBatch, Vec3};
//!
//! let mut mesh = Mesh::from_arrays(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2], [2, 3, 0]],
//! )
//! .unwrap();
//! mesh.build(BuildConfig::default().with_quality(Quality::High)).unwrap();
//!
//! let batch = RayBatch::shared_direction(
//!     vec![Point3::new(0.75, 0.25, 1.0), Point3::new(3.0, 3.0, 1.0)],
//!     Vec3::new(0.0, 0.0, -1.0),
//! );
//! assert_eq!(mesh.occlusion_batch(&batch).unwrap(), vec![true, false]);
//! ```

mod config;
pub mod error;
mod mesh;

pub use config::BuildConfig;
pub use error::{MeshError, Result};
pub use mesh::Mesh;

pub use raymesh_bvh::{
    BatchError, Bounded, Bvh, BvhStats, IntersectionMode, Quality, Ray, RayBatch, RayHit,
    RayLayout, TraversalStats, TraverseIter,
};
pub use raymesh_geom::{Aabb3, GeometryError, GeometryStore};
pub use raymesh_math::{Point3, Vec3};
