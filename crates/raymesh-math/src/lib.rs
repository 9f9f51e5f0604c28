#![warn(missing_docs)]

//! Math types for the raymesh ray query kernel.
//!
//! Thin wrappers around nalgebra providing the point and vector types used
//! by every other crate, plus the floating-point error bounds needed by the
//! watertight intersection path.

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// Machine epsilon for the working precision, halved (unit roundoff).
pub const UNIT_ROUNDOFF: f64 = f64::EPSILON * 0.5;

/// Conservative bound on the relative error of `n` chained floating-point
/// operations: `n·u / (1 - n·u)`.
#[inline]
pub fn gamma(n: u32) -> f64 {
    let nu = n as f64 * UNIT_ROUNDOFF;
    nu / (1.0 - nu)
}

/// Index of the component with the largest absolute value (0=X, 1=Y, 2=Z).
///
/// Ties resolve to the lowest axis so the result is deterministic.
#[inline]
pub fn max_dimension(v: &Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

/// Reorder the components of `v` as `(v[x], v[y], v[z])`.
#[inline]
pub fn permute(v: &Vec3, x: usize, y: usize, z: usize) -> Vec3 {
    Vec3::new(v[x], v[y], v[z])
}

/// Returns `true` if every coordinate is finite.
#[inline]
pub fn is_finite(v: &Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
