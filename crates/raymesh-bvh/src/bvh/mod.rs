//! Bounding Volume Hierarchy over mesh triangles.
//!
//! The tree is stored as a flat node array in depth-first order with the
//! root at index 0. Leaves reference a contiguous range of
//! [`Bvh::triangle_order`], which maps leaf slots back to triangle ids;
//! triangle corners are copied into the same order so a leaf test reads
//! contiguous memory.

mod build;
mod traverse;

pub use build::{BvhBuilder, Quality};
pub use traverse::{Bounded, TraversalStats, TraverseIter};

use raymesh_geom::{Aabb3, GeometryStore};
use raymesh_math::Point3;

use crate::intersect::IntersectionMode;

/// A BVH node: either a leaf holding triangles or an internal node with two
/// children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BvhNode {
    /// Leaf node.
    Leaf {
        /// Bounds of the leaf's triangles.
        aabb: Aabb3,
        /// First slot in the hierarchy's triangle order.
        first: u32,
        /// Number of triangles, always at least one.
        count: u32,
    },
    /// Internal node.
    Internal {
        /// Bounds of the whole subtree.
        aabb: Aabb3,
        /// Index of the left child in the node array.
        left: u32,
        /// Index of the right child in the node array.
        right: u32,
    },
}

impl BvhNode {
    /// Bounding box of this node.
    #[inline]
    pub fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }

    /// `true` for leaf nodes.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BvhNode::Leaf { .. })
    }
}

/// Shape summary of a built hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    /// Total number of nodes.
    pub node_count: usize,
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Length of the longest root-to-leaf path (root alone = 0).
    pub max_depth: usize,
    /// Triangle count of the fullest leaf.
    pub max_leaf_size: usize,
}

/// Bounding Volume Hierarchy for ray queries against a triangle mesh.
///
/// Read-only after construction and `Send + Sync`, so any number of threads
/// may query it concurrently.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangle_order: Vec<u32>,
    triangles: Vec<[Point3; 3]>,
    mode: IntersectionMode,
    quality: Quality,
    stats: BvhStats,
}

impl Bvh {
    /// Build a hierarchy with default builder settings.
    pub fn build(store: &GeometryStore, quality: Quality, mode: IntersectionMode) -> Self {
        BvhBuilder::new(quality).mode(mode).build(store)
    }

    /// Node array, root first. Empty for a mesh without triangles.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Root node, if any.
    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    /// Leaf slot to triangle id map.
    pub fn triangle_order(&self) -> &[u32] {
        &self.triangle_order
    }

    /// Number of triangles indexed by the hierarchy.
    pub fn num_triangles(&self) -> usize {
        self.triangle_order.len()
    }

    /// `true` if the hierarchy indexes no triangles.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds of the whole mesh; empty for an empty hierarchy.
    pub fn bounds(&self) -> Aabb3 {
        self.root().map(|n| *n.aabb()).unwrap_or_default()
    }

    /// Kernel used by every query on this hierarchy.
    pub fn mode(&self) -> IntersectionMode {
        self.mode
    }

    /// Quality level the hierarchy was built with.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Shape summary.
    pub fn stats(&self) -> &BvhStats {
        &self.stats
    }

    /// Corners of the triangle stored at leaf slot `slot`.
    #[inline]
    fn slot_triangle(&self, slot: usize) -> &[Point3; 3] {
        &self.triangles[slot]
    }
}
