#![warn(missing_docs)]

//! Bounding volume hierarchy and ray queries for triangle meshes.
//!
//! # Architecture
//!
//! - [`Ray`] - origin, direction and valid parameter interval
//! - [`RayHit`] - closest-hit result with barycentrics, point and normal
//! - [`intersect`] - fast and watertight ray-triangle kernels
//! - [`bvh`] - hierarchy construction and closest/any/enumerate traversal
//! - [`RayBatch`] - array inputs dispatched across rayon workers
//!
//! # Example
//!
//! ```
//! use raymesh_bvh::{Bvh, IntersectionMode, Quality, Ray};
//! use raymesh_geom::GeometryStore;
//! use raymesh_math::{Point3, Vec3};
//!
//! let store = GeometryStore::from_arrays(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2]],
//! )
//! .unwrap();
//! let bvh = Bvh::build(&store, Quality::Medium, IntersectionMode::Fast);
//!
//! let ray = Ray::new(Point3::new(0.2, 0.2, 1.0), Vec3::new(0.0, 0.0, -1.0));
//! let hit = bvh.closest_hit(&ray).unwrap();
//! assert_eq!(hit.triangle_id, 0);
//! assert!(bvh.any_hit(&ray));
//! assert_eq!(bvh.traverse_all(&ray), vec![0]);
//! ```

mod batch;
pub mod bvh;
pub mod error;
pub mod intersect;
mod ray;

pub use batch::{RayBatch, RayLayout};
pub use bvh::{Bounded, Bvh, BvhBuilder, BvhNode, BvhStats, Quality, TraversalStats, TraverseIter};
pub use error::{BatchError, ParseQualityError, Result};
pub use intersect::{IntersectionMode, TriangleHit};
pub use ray::{Ray, RayHit};
