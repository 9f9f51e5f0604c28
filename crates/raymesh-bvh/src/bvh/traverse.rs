//! Ray queries over a built hierarchy.
//!
//! Every walk uses an explicit node stack. Child boxes are clipped against
//! the current best distance before they are pushed, so a closest-hit walk
//! shrinks its search interval as hits are found.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::{Bvh, BvhNode};
use crate::intersect::{RayKernel, TriangleHit};
use crate::ray::{Ray, RayHit};
use raymesh_math::Vec3;

/// Inline capacity of the traversal stack; deeper trees spill to the heap.
const STACK_CAPACITY: usize = 64;

type NodeStack = SmallVec<[u32; STACK_CAPACITY]>;

/// Work done by a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Nodes popped from the stack and inspected.
    pub nodes_visited: u64,
    /// Ray-triangle kernel invocations.
    pub triangles_tested: u64,
}

/// Result of a query with a node visit budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounded<T> {
    /// Best answer found within the budget.
    pub value: T,
    /// Work performed.
    pub stats: TraversalStats,
    /// `true` if the budget ran out before the walk finished, in which case
    /// `value` may differ from the unbounded answer.
    pub truncated: bool,
}

/// Best candidate of a closest-hit walk.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot: usize,
    id: u32,
    hit: TriangleHit,
}

impl Bvh {
    /// Nearest intersection in the ray's interval.
    ///
    /// When several triangles are hit at the same `t` (a ray through a
    /// shared edge or vertex), the lowest triangle id wins regardless of the
    /// tree's shape. Invalid rays never hit.
    pub fn closest_hit(&self, ray: &Ray) -> Option<RayHit> {
        self.closest_hit_bounded(ray, u64::MAX).value
    }

    /// [`closest_hit`](Self::closest_hit) that stops after visiting
    /// `max_node_visits` nodes.
    pub fn closest_hit_bounded(
        &self,
        ray: &Ray,
        max_node_visits: u64,
    ) -> Bounded<Option<RayHit>> {
        let mut stats = TraversalStats::default();
        let mut truncated = false;
        let mut best: Option<Candidate> = None;

        let Some(mut stack) = self.start(ray) else {
            return Bounded {
                value: None,
                stats,
                truncated,
            };
        };
        let kernel = RayKernel::new(self.mode, ray);
        let mut best_t = ray.t_max();

        while let Some(idx) = stack.pop() {
            if stats.nodes_visited >= max_node_visits {
                truncated = true;
                break;
            }
            stats.nodes_visited += 1;

            match self.nodes[idx as usize] {
                BvhNode::Leaf { first, count, .. } => {
                    let first = first as usize;
                    for slot in first..first + count as usize {
                        stats.triangles_tested += 1;
                        let tri = self.slot_triangle(slot);
                        let Some(hit) = kernel.intersect(ray, tri, best_t) else {
                            continue;
                        };
                        let id = self.triangle_order[slot];
                        let better = match best {
                            None => true,
                            Some(b) => hit.t < b.hit.t || (hit.t == b.hit.t && id < b.id),
                        };
                        if better {
                            best_t = hit.t;
                            best = Some(Candidate { slot, id, hit });
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    let near_left = self.entry(ray, left, best_t);
                    let near_right = self.entry(ray, right, best_t);
                    // push the farther child first so the nearer one is popped next
                    match (near_left, near_right) {
                        (Some(lt), Some(rt)) => {
                            if lt <= rt {
                                stack.push(right);
                                stack.push(left);
                            } else {
                                stack.push(left);
                                stack.push(right);
                            }
                        }
                        (Some(_), None) => stack.push(left),
                        (None, Some(_)) => stack.push(right),
                        (None, None) => {}
                    }
                }
            }
        }

        Bounded {
            value: best.map(|c| self.make_hit(ray, c)),
            stats,
            truncated,
        }
    }

    /// `true` if any triangle intersects the ray's interval. Returns on the
    /// first accepted triangle.
    pub fn any_hit(&self, ray: &Ray) -> bool {
        self.any_hit_bounded(ray, u64::MAX).value
    }

    /// [`any_hit`](Self::any_hit) that stops after visiting
    /// `max_node_visits` nodes.
    pub fn any_hit_bounded(&self, ray: &Ray, max_node_visits: u64) -> Bounded<bool> {
        let mut stats = TraversalStats::default();

        let Some(mut stack) = self.start(ray) else {
            return Bounded {
                value: false,
                stats,
                truncated: false,
            };
        };
        let kernel = RayKernel::new(self.mode, ray);
        let t_max = ray.t_max();

        while let Some(idx) = stack.pop() {
            if stats.nodes_visited >= max_node_visits {
                return Bounded {
                    value: false,
                    stats,
                    truncated: true,
                };
            }
            stats.nodes_visited += 1;

            match self.nodes[idx as usize] {
                BvhNode::Leaf { first, count, .. } => {
                    let first = first as usize;
                    for slot in first..first + count as usize {
                        stats.triangles_tested += 1;
                        if kernel.intersect(ray, self.slot_triangle(slot), t_max).is_some() {
                            return Bounded {
                                value: true,
                                stats,
                                truncated: false,
                            };
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    for child in [right, left] {
                        if self.entry(ray, child, t_max).is_some() {
                            stack.push(child);
                        }
                    }
                }
            }
        }

        Bounded {
            value: false,
            stats,
            truncated: false,
        }
    }

    /// Lazily enumerate every triangle the kernel accepts in the ray's
    /// interval. Each id appears once; the order is unspecified.
    pub fn traverse(&self, ray: &Ray) -> TraverseIter<'_> {
        TraverseIter {
            bvh: self,
            ray: *ray,
            kernel: RayKernel::new(self.mode, ray),
            stack: self.start(ray).unwrap_or_default(),
            slots: 0..0,
            stats: TraversalStats::default(),
        }
    }

    /// [`traverse`](Self::traverse), collected.
    pub fn traverse_all(&self, ray: &Ray) -> Vec<u32> {
        self.traverse(ray).collect()
    }

    /// Stack holding the root, or `None` if the walk cannot find anything.
    fn start(&self, ray: &Ray) -> Option<NodeStack> {
        if !ray.is_valid() {
            return None;
        }
        self.entry(ray, 0, ray.t_max())?;
        let mut stack = NodeStack::new();
        stack.push(0);
        Some(stack)
    }

    /// Entry distance of the ray into node `idx`, within `[t_min, t_limit]`.
    #[inline]
    fn entry(&self, ray: &Ray, idx: u32, t_limit: f64) -> Option<f64> {
        let node = self.nodes.get(idx as usize)?;
        ray.clip_aabb(node.aabb(), t_limit).map(|(t0, _)| t0)
    }

    fn make_hit(&self, ray: &Ray, c: Candidate) -> RayHit {
        let [v0, v1, v2] = self.slot_triangle(c.slot);
        let normal = (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(0.0)
            .unwrap_or_else(Vec3::zeros);
        RayHit {
            triangle_id: c.id,
            t: c.hit.t,
            u: c.hit.u,
            v: c.hit.v,
            point: ray.at(c.hit.t),
            normal,
        }
    }
}

/// Lazy iterator returned by [`Bvh::traverse`].
///
/// Performs the walk incrementally: each call to `next` resumes where the
/// previous one stopped.
#[derive(Debug, Clone)]
pub struct TraverseIter<'a> {
    bvh: &'a Bvh,
    ray: Ray,
    kernel: RayKernel,
    stack: NodeStack,
    /// Leaf slots still to test.
    slots: std::ops::Range<usize>,
    stats: TraversalStats,
}

impl TraverseIter<'_> {
    /// Work performed so far.
    pub fn stats(&self) -> TraversalStats {
        self.stats
    }
}

impl Iterator for TraverseIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let bvh = self.bvh;
        let t_max = self.ray.t_max();
        loop {
            for slot in self.slots.by_ref() {
                self.stats.triangles_tested += 1;
                if self
                    .kernel
                    .intersect(&self.ray, bvh.slot_triangle(slot), t_max)
                    .is_some()
                {
                    return Some(bvh.triangle_order[slot]);
                }
            }

            let idx = self.stack.pop()?;
            self.stats.nodes_visited += 1;
            match bvh.nodes[idx as usize] {
                BvhNode::Leaf { first, count, .. } => {
                    let first = first as usize;
                    self.slots = first..first + count as usize;
                }
                BvhNode::Internal { left, right, .. } => {
                    for child in [right, left] {
                        if bvh.entry(&self.ray, child, t_max).is_some() {
                            self.stack.push(child);
                        }
                    }
                }
            }
        }
    }
}

impl FusedIterator for TraverseIter<'_> {}
