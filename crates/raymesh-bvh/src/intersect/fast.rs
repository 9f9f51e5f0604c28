//! Möller–Trumbore ray-triangle intersection.

use raymesh_math::Point3;

use super::TriangleHit;
use crate::Ray;

/// Determinants below this fraction of `|e1|·|e2|·|d|` are treated as a ray
/// parallel to (or a triangle degenerate in) the plane.
const PARALLEL_TOLERANCE: f64 = 1e-12;

/// Intersect a ray with a triangle using the Möller–Trumbore test.
///
/// Accepts hits inside the ray's `[t_min, t_max]` interval. Edges and
/// vertices count as inside. Rays nearly parallel to the triangle are
/// reported as misses.
pub fn intersect_fast(ray: &Ray, tri: &[Point3; 3]) -> Option<TriangleHit> {
    let hit = moller_trumbore(ray, tri)?;
    (hit.t >= ray.t_min() && hit.t <= ray.t_max()).then_some(hit)
}

/// The unclipped test: any `t`, including negative ones.
#[inline]
pub(super) fn moller_trumbore(ray: &Ray, tri: &[Point3; 3]) -> Option<TriangleHit> {
    let dir = ray.direction();
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];

    let p = dir.cross(&e2);
    let det = e1.dot(&p);

    let scale = e1.norm() * e2.norm() * dir.norm();
    // also rejects NaN
    if !(det.abs() > PARALLEL_TOLERANCE * scale) {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin() - tri[0];
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    Some(TriangleHit { t, u, v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use raymesh_math::Vec3;

    fn tri() -> [Point3; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
        ]
    }

    #[test]
    fn test_barycentric() {
        let ray = Ray::new(Point3::new(2.0, 3.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_fast(&ray, &tri()).unwrap();
        assert_relative_eq!(hit.t, 5.0);
        assert_relative_eq!(hit.u, 0.2);
        assert_relative_eq!(hit.v, 0.3);
    }

    #[test]
    fn test_outside_edge() {
        let ray = Ray::new(Point3::new(6.0, 6.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_fast(&ray, &tri()).is_none());
    }

    #[test]
    fn test_nearly_parallel_is_miss() {
        let ray = Ray::new(Point3::new(-1.0, 1.0, 1e-20), Vec3::new(1.0, 0.0, -1e-20));
        assert!(intersect_fast(&ray, &tri()).is_none());
    }

    #[test]
    fn test_oblique_unnormalized_direction() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 4.0), Vec3::new(2.0, 2.0, -4.0));
        let hit = intersect_fast(&ray, &tri()).unwrap();
        assert_relative_eq!(hit.t, 1.0);
        assert_relative_eq!(ray.at(hit.t), Point3::new(2.0, 2.0, 0.0));
    }
}
