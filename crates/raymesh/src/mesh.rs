//! The queryable mesh.

use raymesh_bvh::{Bvh, BvhBuilder, Ray, RayBatch, RayHit, TraverseIter};
use raymesh_geom::GeometryStore;
use raymesh_math::Point3;
use tracing::debug;

use crate::config::BuildConfig;
use crate::error::{MeshError, Result};

/// A hierarchy together with the config and geometry version it was built
/// from.
#[derive(Debug, Clone)]
struct Built {
    bvh: Bvh,
    config: BuildConfig,
    version: u64,
}

/// A triangle mesh with an optional acceleration structure.
///
/// Queries require a [`build`](Self::build) first, and again after every
/// [`merge`](Self::merge) that adds geometry.
///
/// ```
/// use raymesh::{BuildConfig, Mesh, Point3, Ray, Vec3};
///
/// let mut mesh = Mesh::from_arrays(
///     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
///     &[[0, 1, 2], [2, 3, 0]],
/// )
/// .unwrap();
/// mesh.build(BuildConfig::default()).unwrap();
///
/// let ray = Ray::new(Point3::new(0.5, 0.5, 1.0), Vec3::new(0.0, 0.0, -1.0));
/// let hit = mesh.intersect(&ray).unwrap().unwrap();
/// assert_eq!(hit.triangle_id, 0);
/// assert_eq!(hit.t, 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    geometry: GeometryStore,
    built: Option<Built>,
    /// Bumped by every merge that changes the geometry.
    version: u64,
}

impl Mesh {
    /// Create a mesh from vertex positions and triangle index triples.
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        Ok(Self::from_store(GeometryStore::new(vertices, triangles)?))
    }

    /// Create a mesh from coordinate triples.
    pub fn from_arrays(vertices: &[[f64; 3]], triangles: &[[u32; 3]]) -> Result<Self> {
        let geometry = GeometryStore::from_arrays(vertices, triangles)?;
        Ok(Self::from_store(geometry))
    }

    /// Create a mesh from interleaved `[x, y, z, ...]` and `[i0, i1, i2, ...]`
    /// buffers.
    pub fn from_flat(vertices: &[f64], indices: &[u32]) -> Result<Self> {
        Ok(Self::from_store(GeometryStore::from_flat(vertices, indices)?))
    }

    /// A mesh with no geometry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an existing store.
    pub fn from_store(geometry: GeometryStore) -> Self {
        Self {
            geometry,
            built: None,
            version: 0,
        }
    }

    /// Build (or rebuild from scratch) the acceleration structure.
    pub fn build(&mut self, config: BuildConfig) -> Result<()> {
        config.validate()?;
        let bvh = BvhBuilder::new(config.quality)
            .mode(config.mode())
            .max_leaf_size(config.max_leaf_size)
            .build(&self.geometry);
        self.built = Some(Built {
            bvh,
            config,
            version: self.version,
        });
        Ok(())
    }

    /// [`build`](Self::build) with [`BuildConfig::default`].
    pub fn build_default(&mut self) -> Result<()> {
        self.build(BuildConfig::default())
    }

    /// Append another mesh's geometry. Triangle ids of `other` are shifted
    /// past this mesh's existing triangles; vertex indices past its
    /// existing vertices.
    ///
    /// Any existing hierarchy becomes stale until the next build.
    pub fn merge(&mut self, other: &Mesh) -> Result<()> {
        if other.geometry.num_vertices() == 0 && other.geometry.is_empty() {
            return Ok(());
        }
        self.geometry.merge(&other.geometry)?;
        self.version += 1;
        if self.built.is_some() {
            debug!(version = self.version, "hierarchy is stale after merge");
        }
        Ok(())
    }

    /// Closest hit, if any.
    pub fn intersect(&self, ray: &Ray) -> Result<Option<RayHit>> {
        Ok(self.ready()?.closest_hit(ray))
    }

    /// Closest hit for every ray of the batch, in ray order.
    pub fn intersect_batch(&self, batch: &RayBatch) -> Result<Vec<Option<RayHit>>> {
        Ok(self.ready()?.intersect_batch(batch)?)
    }

    /// `true` if anything blocks the ray within its interval.
    pub fn occlusion(&self, ray: &Ray) -> Result<bool> {
        Ok(self.ready()?.any_hit(ray))
    }

    /// Occlusion flag for every ray of the batch, in ray order.
    pub fn occlusion_batch(&self, batch: &RayBatch) -> Result<Vec<bool>> {
        Ok(self.ready()?.occlusion_batch(batch)?)
    }

    /// Lazily enumerate the ids of all triangles the ray intersects.
    pub fn traverse(&self, ray: &Ray) -> Result<TraverseIter<'_>> {
        Ok(self.ready()?.traverse(ray))
    }

    /// Ids of all triangles the ray intersects, in unspecified order.
    pub fn traverse_all(&self, ray: &Ray) -> Result<Vec<u32>> {
        Ok(self.ready()?.traverse_all(ray))
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Point3] {
        self.geometry.vertices()
    }

    /// Triangle index triples.
    pub fn triangles(&self) -> &[[u32; 3]] {
        self.geometry.triangles()
    }

    /// Underlying geometry store.
    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    /// Config of the last build, if any.
    pub fn config(&self) -> Option<&BuildConfig> {
        self.built.as_ref().map(|b| &b.config)
    }

    /// `true` once a hierarchy exists, stale or not.
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// `true` if geometry was merged after the last build.
    pub fn is_stale(&self) -> bool {
        self.built
            .as_ref()
            .is_some_and(|b| b.version != self.version)
    }

    /// The hierarchy of the last build, stale or not.
    pub fn bvh(&self) -> Option<&Bvh> {
        self.built.as_ref().map(|b| &b.bvh)
    }

    fn ready(&self) -> Result<&Bvh> {
        let built = self.built.as_ref().ok_or(MeshError::NotBuilt)?;
        if built.version != self.version {
            return Err(MeshError::Stale);
        }
        Ok(&built.bvh)
    }
}

impl From<GeometryStore> for Mesh {
    fn from(geometry: GeometryStore) -> Self {
        Self::from_store(geometry)
    }
}
