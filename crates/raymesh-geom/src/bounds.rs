//! Axis-aligned bounding boxes for triangles and whole meshes.

use rayon::prelude::*;
use raymesh_math::{Point3, Vec3};

use crate::GeometryStore;

/// Below this triangle count bounds are computed on the calling thread.
const PARALLEL_BOUNDS_THRESHOLD: usize = 16 * 1024;

/// Axis-aligned bounding box in 3D.
///
/// The empty box has `min = +inf` and `max = -inf` on every axis, so any
/// point included into it produces a valid (possibly flat) box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Tight bounds of a triangle.
    pub fn from_triangle(v0: &Point3, v1: &Point3, v2: &Point3) -> Self {
        let mut aabb = Self::empty();
        aabb.include_point(v0);
        aabb.include_point(v1);
        aabb.include_point(v2);
        aabb
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another box.
    pub fn include(&mut self, other: &Aabb3) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    /// Union of two boxes.
    pub fn union(&self, other: &Aabb3) -> Aabb3 {
        let mut out = *self;
        out.include(other);
        out
    }

    /// `true` if no point has been included.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Box center. Meaningless for the empty box.
    pub fn centroid(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Size along each axis; zero for the empty box.
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::zeros();
        }
        self.max - self.min
    }

    /// Index of the longest axis (0=X, 1=Y, 2=Z), lowest axis on ties.
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Surface area; zero for empty and for point boxes.
    pub fn surface_area(&self) -> f64 {
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Inclusive containment test.
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

/// Compute one AABB per triangle, indexed by triangle id.
pub fn triangle_bounds(store: &GeometryStore) -> Vec<Aabb3> {
    let bounds_of = |tri: &[u32; 3]| {
        let v = store.vertices();
        Aabb3::from_triangle(
            &v[tri[0] as usize],
            &v[tri[1] as usize],
            &v[tri[2] as usize],
        )
    };

    if store.num_triangles() >= PARALLEL_BOUNDS_THRESHOLD {
        store.triangles().par_iter().map(bounds_of).collect()
    } else {
        store.triangles().iter().map(bounds_of).collect()
    }
}

/// Union of all triangle bounds. Unreferenced vertices do not contribute.
pub fn scene_bounds(store: &GeometryStore) -> Aabb3 {
    triangle_bounds(store)
        .iter()
        .fold(Aabb3::empty(), |acc, b| acc.union(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_box() {
        let b = Aabb3::empty();
        assert!(b.is_empty());
        assert_eq!(b.surface_area(), 0.0);
        assert!(!b.min.x.is_nan());
    }

    #[test]
    fn test_from_triangle() {
        let b = Aabb3::from_triangle(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 1.0),
            &Point3::new(1.0, 3.0, 0.0),
        );
        assert_eq!(b.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max, Point3::new(2.0, 3.0, 1.0));
        assert_eq!(b.longest_axis(), 1);
        assert_relative_eq!(b.surface_area(), 2.0 * (6.0 + 3.0 + 2.0));
    }

    #[test]
    fn test_flat_box_is_valid() {
        // zero-area triangle: all points on a line
        let b = Aabb3::from_triangle(
            &Point3::new(0.0, 0.0, 5.0),
            &Point3::new(1.0, 0.0, 5.0),
            &Point3::new(2.0, 0.0, 5.0),
        );
        assert!(!b.is_empty());
        assert_eq!(b.min.y, b.max.y);
        assert_eq!(b.min.z, b.max.z);
        assert_eq!(b.surface_area(), 0.0);
        assert!(b.contains_point(&Point3::new(1.5, 0.0, 5.0)));
    }

    #[test]
    fn test_union() {
        let a = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb3::new(Point3::new(2.0, -1.0, 0.5), Point3::new(3.0, 0.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(u.max, Point3::new(3.0, 1.0, 1.0));
        assert_eq!(Aabb3::empty().union(&a), a);
    }

    #[test]
    fn test_triangle_and_scene_bounds() {
        let store = GeometryStore::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 10.0),
                Point3::new(1.0, 0.0, 10.0),
                Point3::new(1.0, 1.0, 10.0),
                Point3::new(-50.0, -50.0, -50.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
        .unwrap();

        let per_tri = triangle_bounds(&store);
        assert_eq!(per_tri.len(), 2);
        assert_eq!(per_tri[1].min.z, 10.0);

        // vertex 6 is unreferenced
        let scene = scene_bounds(&store);
        assert_eq!(scene.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(scene.max, Point3::new(1.0, 1.0, 10.0));
    }

    #[test]
    fn test_scene_bounds_empty_store() {
        let store = GeometryStore::default();
        assert!(scene_bounds(&store).is_empty());
    }
}
