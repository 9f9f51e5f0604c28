//! Vertex and triangle index storage.

use raymesh_math::Point3;
use tracing::debug;

use crate::error::{GeometryError, Result};

/// Immutable-after-construction vertex and index buffers.
///
/// A triangle's id is its position in [`triangles`](Self::triangles); a
/// vertex's id is its position in [`vertices`](Self::vertices). Every index
/// is checked against the vertex count on construction, so code holding a
/// `GeometryStore` may index vertices without further checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStore {
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
}

impl GeometryStore {
    /// Create a store, validating every triangle index and vertex coordinate.
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        check_vertex_count(vertices.len())?;

        if let Some(vertex) = vertices
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(GeometryError::NonFiniteVertex { vertex });
        }

        let vertex_count = vertices.len();
        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GeometryError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(Self {
            vertices,
            triangles,
        })
    }

    /// Create from coordinate triples.
    pub fn from_arrays(vertices: &[[f64; 3]], triangles: &[[u32; 3]]) -> Result<Self> {
        let verts = vertices
            .iter()
            .map(|v| Point3::new(v[0], v[1], v[2]))
            .collect();
        Self::new(verts, triangles.to_vec())
    }

    /// Create from interleaved buffers: `[x0, y0, z0, x1, ...]` and
    /// `[i0, i1, i2, ...]`.
    pub fn from_flat(vertices: &[f64], indices: &[u32]) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(GeometryError::LengthMismatch {
                buffer: "vertex",
                len: vertices.len(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(GeometryError::LengthMismatch {
                buffer: "index",
                len: indices.len(),
            });
        }

        let verts = vertices
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();
        let tris = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::new(verts, tris)
    }

    /// Vertex positions, indexed by vertex id.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Triangle index triples, indexed by triangle id.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// `true` if the store has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The three corner positions of triangle `id`, or `None` if out of range.
    pub fn triangle_vertices(&self, id: usize) -> Option<[Point3; 3]> {
        let tri = self.triangles.get(id)?;
        Some([
            self.vertices[tri[0] as usize],
            self.vertices[tri[1] as usize],
            self.vertices[tri[2] as usize],
        ])
    }

    /// Append another store's geometry to this one.
    ///
    /// `other`'s vertices are appended unchanged; its triangles are appended
    /// in order with every index shifted by this store's vertex count before
    /// the merge. Merging an empty store leaves `self` untouched.
    pub fn merge(&mut self, other: &GeometryStore) -> Result<()> {
        if other.vertices.is_empty() && other.triangles.is_empty() {
            return Ok(());
        }

        let combined = self.vertices.len() + other.vertices.len();
        check_vertex_count(combined)?;

        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );

        debug!(
            offset,
            added_vertices = other.vertices.len(),
            added_triangles = other.triangles.len(),
            "merged geometry"
        );
        Ok(())
    }
}

fn check_vertex_count(count: usize) -> Result<()> {
    if count > u32::MAX as usize {
        return Err(GeometryError::TooManyVertices(count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(z: f64) -> GeometryStore {
        GeometryStore::from_arrays(
            &[
                [0.0, 0.0, z],
                [1.0, 0.0, z],
                [1.0, 1.0, z],
                [0.0, 1.0, z],
            ],
            &[[0, 1, 2], [2, 3, 0]],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = GeometryStore::from_arrays(&[[0.0; 3], [1.0; 3]], &[[0, 1, 2]]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::IndexOutOfRange {
                triangle: 0,
                index: 2,
                vertex_count: 2
            }
        );
    }

    #[test]
    fn test_new_rejects_nan() {
        let err = GeometryStore::from_arrays(&[[0.0; 3], [f64::NAN, 0.0, 0.0]], &[]).unwrap_err();
        assert_eq!(err, GeometryError::NonFiniteVertex { vertex: 1 });
    }

    #[test]
    fn test_empty_is_valid() {
        let store = GeometryStore::new(Vec::new(), Vec::new()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.num_vertices(), 0);
    }

    #[test]
    fn test_degenerate_triangle_is_valid() {
        let store = GeometryStore::from_arrays(&[[0.0; 3]], &[[0, 0, 0]]).unwrap();
        assert_eq!(store.num_triangles(), 1);
    }

    #[test]
    fn test_from_flat() {
        let store = GeometryStore::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        )
        .unwrap();
        assert_eq!(store.num_vertices(), 3);
        assert_eq!(store.triangles(), &[[0, 1, 2]]);

        let err = GeometryStore::from_flat(&[0.0, 0.0], &[]).unwrap_err();
        assert!(matches!(err, GeometryError::LengthMismatch { buffer: "vertex", len: 2 }));
        let err = GeometryStore::from_flat(&[0.0; 9], &[0, 1]).unwrap_err();
        assert!(matches!(err, GeometryError::LengthMismatch { buffer: "index", len: 2 }));
    }

    #[test]
    fn test_triangle_vertices() {
        let store = plane(3.0);
        let [a, b, c] = store.triangle_vertices(1).unwrap();
        assert_eq!(a, Point3::new(1.0, 1.0, 3.0));
        assert_eq!(b, Point3::new(0.0, 1.0, 3.0));
        assert_eq!(c, Point3::new(0.0, 0.0, 3.0));
        assert!(store.triangle_vertices(2).is_none());
    }

    #[test]
    fn test_merge_empty_is_noop() {
        let base = plane(0.0);
        let mut merged = plane(0.0);
        merged.merge(&GeometryStore::default()).unwrap();
        assert_eq!(merged, base);
    }

    #[test]
    fn test_merge_shifts_indices() {
        let mut a = plane(0.0);
        let b = plane(1.0);
        a.merge(&b).unwrap();

        assert_eq!(a.num_vertices(), 8);
        assert_eq!(a.num_triangles(), 4);
        assert_eq!(a.triangles()[2], [4, 5, 6]);
        assert_eq!(a.triangles()[3], [6, 7, 4]);
        assert_eq!(&a.vertices()[4..], b.vertices());
    }

    #[test]
    fn test_merge_into_empty() {
        let mut a = GeometryStore::default();
        let b = plane(1.0);
        a.merge(&b).unwrap();
        assert_eq!(a, b);
    }
}
