#![warn(missing_docs)]

//! Triangle geometry for the raymesh ray query kernel.
//!
//! - [`GeometryStore`] - validated vertex and index buffers with stable ids
//! - [`Aabb3`] - axis-aligned bounding boxes
//! - [`triangle_bounds`] / [`scene_bounds`] - per-triangle and whole-mesh bounds
//!
//! # Example
//!
//! ```
//! use raymesh_geom::{scene_bounds, GeometryStore};
//!
//! let mut store = GeometryStore::from_arrays(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2]],
//! )
//! .unwrap();
//! let copy = store.clone();
//! store.merge(&copy).unwrap();
//! assert_eq!(store.triangles()[1], [3, 4, 5]);
//! assert_eq!(scene_bounds(&store).max.x, 1.0);
//! ```

pub mod bounds;
pub mod error;
mod store;

pub use bounds::{scene_bounds, triangle_bounds, Aabb3};
pub use error::{GeometryError, Result};
pub use store::GeometryStore;
