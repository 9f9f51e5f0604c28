//! Ray-triangle intersection kernels.
//!
//! Two numerical modes share the same inputs and outputs:
//!
//! - [`IntersectionMode::Fast`] - Möller–Trumbore, cheapest per test
//! - [`IntersectionMode::Watertight`] - sheared ray frame with exact edge
//!   function signs, no gaps or double misses along shared edges
//!
//! Both treat triangle edges and vertices as inside. A ray that crosses an
//! edge shared by two triangles hits both of them at the same `t`; the
//! closest-hit query resolves that tie by lowest triangle id.

mod fast;
mod watertight;

pub use fast::intersect_fast;
pub use watertight::{intersect_watertight, ShearedRay};

use raymesh_math::Point3;
use serde::{Deserialize, Serialize};

use crate::Ray;

/// Which ray-triangle kernel a hierarchy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntersectionMode {
    /// Möller–Trumbore.
    #[default]
    Fast,
    /// Watertight sheared-frame test.
    Watertight,
}

/// Result of a single ray-triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the ray.
    pub t: f64,
    /// Barycentric weight of the second vertex.
    pub u: f64,
    /// Barycentric weight of the third vertex.
    pub v: f64,
}

/// Intersect `ray` with a triangle using the given mode, accepting hits in
/// the ray's own interval.
pub fn intersect_triangle(
    mode: IntersectionMode,
    ray: &Ray,
    tri: &[Point3; 3],
) -> Option<TriangleHit> {
    RayKernel::new(mode, ray).intersect(ray, tri, ray.t_max())
}

/// A kernel with its per-ray setup done once, reused for every triangle a
/// traversal tests.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RayKernel {
    Fast,
    Watertight(ShearedRay),
}

impl RayKernel {
    pub(crate) fn new(mode: IntersectionMode, ray: &Ray) -> Self {
        match mode {
            IntersectionMode::Fast => RayKernel::Fast,
            IntersectionMode::Watertight => RayKernel::Watertight(ShearedRay::new(ray)),
        }
    }

    /// Test a triangle, accepting `ray.t_min() <= t <= t_max`.
    #[inline]
    pub(crate) fn intersect(&self, ray: &Ray, tri: &[Point3; 3], t_max: f64) -> Option<TriangleHit> {
        let hit = match self {
            RayKernel::Fast => fast::moller_trumbore(ray, tri)?,
            RayKernel::Watertight(sheared) => sheared.intersect(ray, tri)?,
        };
        if hit.t >= ray.t_min() && hit.t <= t_max {
            Some(hit)
        } else {
            None
        }
    }
}
