//! Ray representation, hit records and the ray-box slab test.

use raymesh_geom::Aabb3;
use raymesh_math::{gamma, is_finite, Point3, Vec3};

/// Direction components with a smaller magnitude are treated as parallel to
/// the corresponding slab instead of being inverted.
const PARALLEL_EPSILON: f64 = f64::MIN_POSITIVE;

/// A ray in 3D space with a valid parameter interval `[t_min, t_max]`.
///
/// The direction is not normalized; hit parameters are measured in units of
/// the direction's length.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    origin: Point3,
    direction: Vec3,
    t_min: f64,
    t_max: f64,
    /// Reciprocal direction, zero on parallel axes.
    inv_direction: Vec3,
    parallel: [bool; 3],
}

impl Ray {
    /// Create a ray covering `[0, +inf)`.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, 0.0, f64::INFINITY)
    }

    /// Create a ray covering `[t_min, t_max]`.
    pub fn with_range(origin: Point3, direction: Vec3, t_min: f64, t_max: f64) -> Self {
        let mut inv_direction = Vec3::zeros();
        let mut parallel = [false; 3];
        for axis in 0..3 {
            if direction[axis].abs() < PARALLEL_EPSILON {
                parallel[axis] = true;
            } else {
                inv_direction[axis] = 1.0 / direction[axis];
            }
        }
        Self {
            origin,
            direction,
            t_min,
            t_max,
            inv_direction,
            parallel,
        }
    }

    /// Ray origin.
    #[inline]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Ray direction as given at construction.
    #[inline]
    pub fn direction(&self) -> &Vec3 {
        &self.direction
    }

    /// Lower end of the valid parameter interval.
    #[inline]
    pub fn t_min(&self) -> f64 {
        self.t_min
    }

    /// Upper end of the valid parameter interval.
    #[inline]
    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    /// A ray can hit something only if its inputs are finite, its direction
    /// is non-zero and its interval is non-empty.
    pub fn is_valid(&self) -> bool {
        is_finite(&self.origin.coords)
            && is_finite(&self.direction)
            && !self.parallel.iter().all(|&p| p)
            && !self.t_min.is_nan()
            && !self.t_max.is_nan()
            && self.t_min <= self.t_max
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_enter, t_exit))` clipped to the ray's interval, or
    /// `None` on a miss. Touching the box counts as a hit.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        self.clip_aabb(aabb, self.t_max)
    }

    /// Slab test against `[t_min, t_limit]`.
    ///
    /// Exit distances are widened by `1 + 2·gamma(3)` so that a triangle
    /// accepted by either intersection kernel is never inside a box this
    /// test rejects. On axes where the ray is parallel to the slab, the
    /// origin must lie inside the slab.
    #[inline]
    pub(crate) fn clip_aabb(&self, aabb: &Aabb3, t_limit: f64) -> Option<(f64, f64)> {
        if aabb.is_empty() {
            return None;
        }

        let far_scale = 1.0 + 2.0 * gamma(3);
        let mut t0 = self.t_min;
        let mut t1 = pad_far(t_limit);

        for axis in 0..3 {
            let o = self.origin[axis];
            let lo = aabb.min[axis];
            let hi = aabb.max[axis];

            if self.parallel[axis] {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = self.inv_direction[axis];
            let mut near = (lo - o) * inv;
            let mut far = (hi - o) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            far *= far_scale;

            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return None;
            }
        }

        Some((t0, t1))
    }
}

/// Widen a far distance by the slab test's error bound.
#[inline]
pub(crate) fn pad_far(t: f64) -> f64 {
    if t.is_finite() {
        t + t.abs() * 2.0 * gamma(3)
    } else {
        t
    }
}

/// Result of a closest-hit query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Id of the struck triangle (its position in the index buffer).
    pub triangle_id: u32,
    /// Parameter along the ray where the intersection occurs.
    pub t: f64,
    /// Barycentric weight of the triangle's second vertex.
    pub u: f64,
    /// Barycentric weight of the triangle's third vertex.
    pub v: f64,
    /// 3D intersection point.
    pub point: Point3,
    /// Unit geometric normal, following the triangle's winding.
    pub normal: Vec3,
}

impl RayHit {
    /// Barycentric coordinates `(w0, w1, w2)` of the hit point.
    pub fn barycentric(&self) -> [f64; 3] {
        [1.0 - self.u - self.v, self.u, self.v]
    }

    /// Mirror `direction` about the hit triangle's plane.
    pub fn reflect(&self, direction: &Vec3) -> Vec3 {
        direction - self.normal * (2.0 * direction.dot(&self.normal))
    }
}
