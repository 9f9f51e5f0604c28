//! Watertight ray-triangle intersection (Woop, Benthin, Wald 2013).
//!
//! The ray is moved into a frame where it starts at the origin and points
//! along +Z (after an axis permutation and a shear). Triangle vertices are
//! transformed into that frame and the 2D edge functions decide coverage.
//! Edge functions of adjacent triangles are computed from the same
//! transformed vertices, so no ray slips between them.

#![allow(clippy::many_single_char_names)]

use raymesh_math::{max_dimension, permute, Point3, Vec3};

use super::TriangleHit;
use crate::Ray;

/// Per-ray constants of the sheared frame.
#[derive(Debug, Clone, Copy)]
pub struct ShearedRay {
    kx: usize,
    ky: usize,
    kz: usize,
    sx: f64,
    sy: f64,
    sz: f64,
    /// `false` for a zero direction, which can hit nothing.
    valid: bool,
}

impl ShearedRay {
    /// Compute the permutation and shear for `ray`.
    pub fn new(ray: &Ray) -> Self {
        let d = ray.direction();
        let kz = max_dimension(d);
        let mut kx = (kz + 1) % 3;
        let mut ky = (kx + 1) % 3;
        // keep the winding of the permuted frame
        if d[kz] < 0.0 {
            std::mem::swap(&mut kx, &mut ky);
        }

        let dz = d[kz];
        let valid = dz != 0.0 && dz.is_finite();
        let (sx, sy, sz) = if valid {
            (-d[kx] / dz, -d[ky] / dz, 1.0 / dz)
        } else {
            (0.0, 0.0, 0.0)
        };

        Self {
            kx,
            ky,
            kz,
            sx,
            sy,
            sz,
            valid,
        }
    }

    /// Unclipped test: any `t`, including negative ones.
    #[inline]
    pub(super) fn intersect(&self, ray: &Ray, tri: &[Point3; 3]) -> Option<TriangleHit> {
        if !self.valid {
            return None;
        }

        let o = ray.origin();
        let to_frame = |p: &Point3| -> Vec3 {
            let rel = permute(&(p - o), self.kx, self.ky, self.kz);
            Vec3::new(rel.x + self.sx * rel.z, rel.y + self.sy * rel.z, rel.z)
        };
        let a = to_frame(&tri[0]);
        let b = to_frame(&tri[1]);
        let c = to_frame(&tri[2]);

        let mut e0 = b.x * c.y - b.y * c.x;
        let mut e1 = c.x * a.y - c.y * a.x;
        let mut e2 = a.x * b.y - a.y * b.x;

        // an exact zero may be a rounding artifact; re-evaluate more accurately
        if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
            e0 = difference_of_products(b.x, c.y, b.y, c.x);
            e1 = difference_of_products(c.x, a.y, c.y, a.x);
            e2 = difference_of_products(a.x, b.y, a.y, b.x);
        }

        let any_negative = e0 < 0.0 || e1 < 0.0 || e2 < 0.0;
        let any_positive = e0 > 0.0 || e1 > 0.0 || e2 > 0.0;
        if any_negative && any_positive {
            return None;
        }

        let det = e0 + e1 + e2;
        // also rejects NaN
        if !(det != 0.0 && det.is_finite()) {
            return None;
        }

        let t_scaled = (e0 * a.z + e1 * b.z + e2 * c.z) * self.sz;
        let inv_det = 1.0 / det;

        Some(TriangleHit {
            t: t_scaled * inv_det,
            u: e1 * inv_det,
            v: e2 * inv_det,
        })
    }
}

/// Intersect a ray with a triangle using the watertight test.
///
/// Accepts hits inside the ray's `[t_min, t_max]` interval. Edges and
/// vertices count as inside; degenerate triangles and rays lying in the
/// triangle's plane are misses.
pub fn intersect_watertight(ray: &Ray, tri: &[Point3; 3]) -> Option<TriangleHit> {
    let hit = ShearedRay::new(ray).intersect(ray, tri)?;
    (hit.t >= ray.t_min() && hit.t <= ray.t_max()).then_some(hit)
}

/// `a*b - c*d` with one rounding error, via fused multiply-add.
#[inline]
fn difference_of_products(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let cd = c * d;
    let err = (-c).mul_add(d, cd);
    let dop = a.mul_add(b, -cd);
    dop + err
}
