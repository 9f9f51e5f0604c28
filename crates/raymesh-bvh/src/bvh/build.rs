//! Hierarchy construction.
//!
//! Nodes are built top-down into a boxed tree and then flattened in
//! depth-first order. Each subtree depends only on the triangles handed to
//! it, so building large subtrees on separate rayon workers yields the same
//! flat array as a sequential build.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use raymesh_geom::{triangle_bounds, Aabb3, GeometryStore};
use raymesh_math::Point3;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use super::{Bvh, BvhNode, BvhStats};
use crate::error::ParseQualityError;
use crate::intersect::IntersectionMode;

/// Cost of visiting one internal node, relative to one triangle test.
const TRAVERSAL_COST: f64 = 0.125;
/// Cost of one ray-triangle test.
const INTERSECTION_COST: f64 = 1.0;
/// Nodes with this many triangles or fewer always become leaves.
const MIN_LEAF_SIZE: usize = 2;
/// Default upper bound on leaf size.
const MAX_LEAF_SIZE: usize = 8;
/// Number of bins per axis for [`Quality::Medium`].
const SAH_BINS: usize = 16;
/// Beyond this depth only median splits are attempted.
const MAX_SAH_DEPTH: usize = 48;
/// Subtrees with at least this many triangles are built in parallel.
const PARALLEL_THRESHOLD: usize = 4096;

/// Split strategy used by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Spatial midpoint split. Fastest build, slowest queries.
    Low,
    /// Binned surface area heuristic.
    #[default]
    Medium,
    /// Exact surface area heuristic over every triangle boundary.
    High,
}

impl Quality {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            other => Err(ParseQualityError(other.to_string())),
        }
    }
}

/// Builds a [`Bvh`] from a geometry store.
///
/// ```
/// use raymesh_bvh::{BvhBuilder, IntersectionMode, Quality};
/// use raymesh_geom::GeometryStore;
///
/// let store = GeometryStore::from_arrays(
///     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
///     &[[0, 1, 2]],
/// )
/// .unwrap();
/// let bvh = BvhBuilder::new(Quality::High)
///     .mode(IntersectionMode::Watertight)
///     .build(&store);
/// assert_eq!(bvh.stats().leaf_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct BvhBuilder {
    quality: Quality,
    mode: IntersectionMode,
    max_leaf_size: usize,
    parallel_threshold: usize,
}

impl Default for BvhBuilder {
    fn default() -> Self {
        Self::new(Quality::default())
    }
}

impl BvhBuilder {
    /// Builder with the given quality and the fast kernel.
    pub fn new(quality: Quality) -> Self {
        Self {
            quality,
            mode: IntersectionMode::Fast,
            max_leaf_size: MAX_LEAF_SIZE,
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }

    /// Select the intersection kernel queries will use.
    pub fn mode(mut self, mode: IntersectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Largest node that may become a leaf when splitting does not pay off.
    /// Clamped to at least the minimum leaf size.
    pub fn max_leaf_size(mut self, size: usize) -> Self {
        self.max_leaf_size = size.max(MIN_LEAF_SIZE);
        self
    }

    /// Smallest subtree handed to a separate rayon task. `usize::MAX`
    /// forces a single-threaded build.
    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    /// Build the hierarchy.
    pub fn build(&self, store: &GeometryStore) -> Bvh {
        let start = Instant::now();

        let mut prims: Vec<BuildPrim> = triangle_bounds(store)
            .into_iter()
            .enumerate()
            .map(|(i, aabb)| BuildPrim {
                id: i as u32,
                centroid: aabb.centroid(),
                aabb,
            })
            .collect();

        let mut nodes = Vec::new();
        let mut triangle_order = Vec::with_capacity(prims.len());
        let mut stats = BvhStats::default();

        if !prims.is_empty() {
            let root = self.build_node(&mut prims, 0);
            flatten_node(&root, 0, &mut nodes, &mut triangle_order, &mut stats);
        }
        stats.node_count = nodes.len();

        let vertices = store.vertices();
        let triangles = triangle_order
            .iter()
            .map(|&id| {
                let t = store.triangles()[id as usize];
                [
                    vertices[t[0] as usize],
                    vertices[t[1] as usize],
                    vertices[t[2] as usize],
                ]
            })
            .collect();

        info!(
            triangles = triangle_order.len(),
            nodes = stats.node_count,
            leaves = stats.leaf_count,
            max_depth = stats.max_depth,
            max_leaf_size = stats.max_leaf_size,
            quality = %self.quality,
            mode = ?self.mode,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "built BVH"
        );

        Bvh {
            nodes,
            triangle_order,
            triangles,
            mode: self.mode,
            quality: self.quality,
            stats,
        }
    }

    /// Build a subtree over `prims`, which is never empty.
    fn build_node(&self, prims: &mut [BuildPrim], depth: usize) -> BuildNode {
        let n = prims.len();
        let mut bounds = Aabb3::empty();
        let mut centroid_bounds = Aabb3::empty();
        for p in prims.iter() {
            bounds.include(&p.aabb);
            centroid_bounds.include_point(&p.centroid);
        }

        if n <= MIN_LEAF_SIZE || centroid_bounds.min == centroid_bounds.max {
            return make_leaf(bounds, prims);
        }

        let leaf_cost = n as f64 * INTERSECTION_COST;
        let split = if depth >= MAX_SAH_DEPTH {
            None
        } else {
            match self.quality {
                Quality::Low => midpoint_split(prims, &bounds, &centroid_bounds),
                Quality::Medium => binned_sah_split(prims, &bounds, &centroid_bounds),
                Quality::High => sweep_sah_split(prims, &bounds),
            }
        };

        let mid = match split {
            Some(s) if s.cost < leaf_cost || n > self.max_leaf_size => s.mid,
            _ if n <= self.max_leaf_size => return make_leaf(bounds, prims),
            _ => {
                trace!(triangles = n, depth, "median split");
                median_split(prims, &centroid_bounds)
            }
        };

        let (left, right) = prims.split_at_mut(mid);
        let (left, right) = if n >= self.parallel_threshold {
            rayon::join(
                || self.build_node(left, depth + 1),
                || self.build_node(right, depth + 1),
            )
        } else {
            (
                self.build_node(left, depth + 1),
                self.build_node(right, depth + 1),
            )
        };

        BuildNode::Internal {
            aabb: bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// A triangle as seen by the builder.
#[derive(Debug, Clone, Copy)]
struct BuildPrim {
    id: u32,
    aabb: Aabb3,
    centroid: Point3,
}

/// Intermediate tree produced before flattening.
enum BuildNode {
    Leaf {
        aabb: Aabb3,
        ids: Vec<u32>,
    },
    Internal {
        aabb: Aabb3,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

/// A partition chosen by one of the split strategies. `prims[..mid]` is the
/// left child; both sides are non-empty.
#[derive(Debug, Clone, Copy)]
struct Split {
    mid: usize,
    cost: f64,
}

fn make_leaf(aabb: Aabb3, prims: &[BuildPrim]) -> BuildNode {
    let mut ids: Vec<u32> = prims.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    BuildNode::Leaf { aabb, ids }
}

fn sah_cost(
    parent_area: f64,
    left_area: f64,
    left_count: usize,
    right_area: f64,
    right_count: usize,
) -> f64 {
    let inv_area = if parent_area > 0.0 {
        1.0 / parent_area
    } else {
        0.0
    };
    TRAVERSAL_COST
        + (left_area * left_count as f64 + right_area * right_count as f64)
            * inv_area
            * INTERSECTION_COST
}

/// Ordering by centroid along `axis`, then by triangle id.
fn centroid_order(a: &BuildPrim, b: &BuildPrim, axis: usize) -> std::cmp::Ordering {
    a.centroid[axis]
        .total_cmp(&b.centroid[axis])
        .then(a.id.cmp(&b.id))
}

/// In-place partition; returns the number of elements satisfying `pred`,
/// which end up at the front.
fn partition<F>(prims: &mut [BuildPrim], pred: F) -> usize
where
    F: Fn(&BuildPrim) -> bool,
{
    let mut mid = 0;
    for i in 0..prims.len() {
        if pred(&prims[i]) {
            prims.swap(i, mid);
            mid += 1;
        }
    }
    mid
}

fn bounds_of(prims: &[BuildPrim]) -> Aabb3 {
    prims.iter().fold(Aabb3::empty(), |acc, p| acc.union(&p.aabb))
}

/// Split at the middle of the centroid bounds along their longest axis.
fn midpoint_split(
    prims: &mut [BuildPrim],
    bounds: &Aabb3,
    centroid_bounds: &Aabb3,
) -> Option<Split> {
    let axis = centroid_bounds.longest_axis();
    let pos = centroid_bounds.centroid()[axis];
    let mid = partition(prims, |p| p.centroid[axis] < pos);
    if mid == 0 || mid == prims.len() {
        return None;
    }

    let (left, right) = prims.split_at(mid);
    let cost = sah_cost(
        bounds.surface_area(),
        bounds_of(left).surface_area(),
        left.len(),
        bounds_of(right).surface_area(),
        right.len(),
    );
    Some(Split { mid, cost })
}

#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb3,
    count: usize,
}

impl Default for Bin {
    fn default() -> Self {
        Self {
            bounds: Aabb3::empty(),
            count: 0,
        }
    }
}

fn bin_index(c: f64, min: f64, extent: f64) -> usize {
    let b = ((c - min) / extent * SAH_BINS as f64) as usize;
    b.min(SAH_BINS - 1)
}

/// Binned SAH over the centroid bounds, evaluated on all three axes.
fn binned_sah_split(
    prims: &mut [BuildPrim],
    bounds: &Aabb3,
    centroid_bounds: &Aabb3,
) -> Option<Split> {
    let parent_area = bounds.surface_area();
    let extent = centroid_bounds.extent();
    // (cost, axis, number of bins on the left)
    let mut best: Option<(f64, usize, usize)> = None;

    for axis in 0..3 {
        if extent[axis] <= 0.0 {
            continue;
        }
        let min = centroid_bounds.min[axis];

        let mut bins = [Bin::default(); SAH_BINS];
        for p in prims.iter() {
            let bin = &mut bins[bin_index(p.centroid[axis], min, extent[axis])];
            bin.count += 1;
            bin.bounds.include(&p.aabb);
        }

        // right_area[b] / right_count[b] describe bins b..SAH_BINS
        let mut right_area = [0.0; SAH_BINS];
        let mut right_count = [0usize; SAH_BINS];
        let mut acc = Aabb3::empty();
        let mut count = 0;
        for b in (1..SAH_BINS).rev() {
            acc.include(&bins[b].bounds);
            count += bins[b].count;
            right_area[b] = acc.surface_area();
            right_count[b] = count;
        }

        let mut left = Aabb3::empty();
        let mut left_count = 0;
        for b in 1..SAH_BINS {
            left.include(&bins[b - 1].bounds);
            left_count += bins[b - 1].count;
            if left_count == 0 || right_count[b] == 0 {
                continue;
            }
            let cost = sah_cost(
                parent_area,
                left.surface_area(),
                left_count,
                right_area[b],
                right_count[b],
            );
            if best.map_or(true, |(c, _, _)| cost < c) {
                best = Some((cost, axis, b));
            }
        }
    }

    let (cost, axis, boundary) = best?;
    let min = centroid_bounds.min[axis];
    let mid = partition(prims, |p| {
        bin_index(p.centroid[axis], min, extent[axis]) < boundary
    });
    Some(Split { mid, cost })
}

/// Exact SAH: every boundary between consecutive triangles in centroid
/// order, on all three axes.
fn sweep_sah_split(prims: &mut [BuildPrim], bounds: &Aabb3) -> Option<Split> {
    let n = prims.len();
    let parent_area = bounds.surface_area();
    let mut right_area = vec![0.0; n];
    // (cost, axis, left count)
    let mut best: Option<(f64, usize, usize)> = None;

    for axis in 0..3 {
        prims.sort_unstable_by(|a, b| centroid_order(a, b, axis));

        let mut acc = Aabb3::empty();
        for i in (1..n).rev() {
            acc.include(&prims[i].aabb);
            right_area[i] = acc.surface_area();
        }

        let mut left = Aabb3::empty();
        for i in 1..n {
            left.include(&prims[i - 1].aabb);
            let cost = sah_cost(parent_area, left.surface_area(), i, right_area[i], n - i);
            if best.map_or(true, |(c, _, _)| cost < c) {
                best = Some((cost, axis, i));
            }
        }
    }

    let (cost, axis, mid) = best?;
    if axis != 2 {
        prims.sort_unstable_by(|a, b| centroid_order(a, b, axis));
    }
    Some(Split { mid, cost })
}

/// Split into equal halves by centroid along the longest centroid axis.
fn median_split(prims: &mut [BuildPrim], centroid_bounds: &Aabb3) -> usize {
    let axis = centroid_bounds.longest_axis();
    let mid = prims.len() / 2;
    prims.select_nth_unstable_by(mid, |a, b| centroid_order(a, b, axis));
    mid
}

/// Flatten a build tree into `nodes` in depth-first order, returning the
/// index of `node`.
fn flatten_node(
    node: &BuildNode,
    depth: usize,
    nodes: &mut Vec<BvhNode>,
    order: &mut Vec<u32>,
    stats: &mut BvhStats,
) -> u32 {
    let idx = nodes.len();
    stats.max_depth = stats.max_depth.max(depth);

    match node {
        BuildNode::Leaf { aabb, ids } => {
            nodes.push(BvhNode::Leaf {
                aabb: *aabb,
                first: order.len() as u32,
                count: ids.len() as u32,
            });
            order.extend_from_slice(ids);
            stats.leaf_count += 1;
            stats.max_leaf_size = stats.max_leaf_size.max(ids.len());
        }
        BuildNode::Internal { aabb, left, right } => {
            // children are patched in once their indices are known
            nodes.push(BvhNode::Internal {
                aabb: *aabb,
                left: 0,
                right: 0,
            });
            let l = flatten_node(left, depth + 1, nodes, order, stats);
            let r = flatten_node(right, depth + 1, nodes, order, stats);
            nodes[idx] = BvhNode::Internal {
                aabb: *aabb,
                left: l,
                right: r,
            };
        }
    }

    idx as u32
}
