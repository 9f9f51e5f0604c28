//! Batched queries.
//!
//! A [`RayBatch`] describes many rays compactly: either every ray shares an
//! origin, every ray shares a direction, or both are given per ray. Results
//! are returned in ray order, one entry per ray.

use rayon::prelude::*;
use raymesh_math::{is_finite, Point3, Vec3};
use tracing::debug;

use crate::bvh::Bvh;
use crate::error::{BatchError, Result};
use crate::ray::{Ray, RayHit};

/// How origins and directions are supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum RayLayout {
    /// One origin, one direction per ray.
    SharedOrigin {
        /// Origin of every ray.
        origin: Point3,
        /// Per-ray directions.
        directions: Vec<Vec3>,
    },
    /// One origin per ray, one direction.
    SharedDirection {
        /// Per-ray origins.
        origins: Vec<Point3>,
        /// Direction of every ray.
        direction: Vec3,
    },
    /// Origin and direction per ray.
    PerRay {
        /// Per-ray origins.
        origins: Vec<Point3>,
        /// Per-ray directions, same length as `origins`.
        directions: Vec<Vec3>,
    },
}

/// A set of rays queried together.
#[derive(Debug, Clone, PartialEq)]
pub struct RayBatch {
    layout: RayLayout,
    t_min: Option<Vec<f64>>,
    t_max: Option<Vec<f64>>,
}

impl RayBatch {
    /// Rays from one point in many directions.
    pub fn shared_origin(origin: Point3, directions: Vec<Vec3>) -> Self {
        Self::from_layout(RayLayout::SharedOrigin { origin, directions })
    }

    /// Parallel rays from many points.
    pub fn shared_direction(origins: Vec<Point3>, direction: Vec3) -> Self {
        Self::from_layout(RayLayout::SharedDirection { origins, direction })
    }

    /// Independent rays.
    pub fn per_ray(origins: Vec<Point3>, directions: Vec<Vec3>) -> Self {
        Self::from_layout(RayLayout::PerRay {
            origins,
            directions,
        })
    }

    /// Wrap a layout with the default `[0, +inf)` range on every ray.
    pub fn from_layout(layout: RayLayout) -> Self {
        Self {
            layout,
            t_min: None,
            t_max: None,
        }
    }

    /// Attach per-ray parameter ranges.
    pub fn with_ranges(mut self, t_min: Vec<f64>, t_max: Vec<f64>) -> Self {
        self.t_min = Some(t_min);
        self.t_max = Some(t_max);
        self
    }

    /// The origin/direction layout.
    pub fn layout(&self) -> &RayLayout {
        &self.layout
    }

    /// Number of rays.
    pub fn len(&self) -> usize {
        match &self.layout {
            RayLayout::SharedOrigin { directions, .. } => directions.len(),
            RayLayout::SharedDirection { origins, .. } => origins.len(),
            RayLayout::PerRay { origins, .. } => origins.len(),
        }
    }

    /// `true` if the batch holds no rays.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check array lengths and that every origin and direction is finite.
    ///
    /// Zero directions and empty ranges are accepted; those rays simply
    /// never hit anything.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();

        if let RayLayout::PerRay { directions, .. } = &self.layout {
            check_len("directions", n, directions.len())?;
        }
        if let Some(t_min) = &self.t_min {
            check_len("t_min", n, t_min.len())?;
        }
        if let Some(t_max) = &self.t_max {
            check_len("t_max", n, t_max.len())?;
        }

        match &self.layout {
            RayLayout::SharedOrigin { origin, directions } => {
                check_finite(0, "origin", &origin.coords)?;
                for (i, d) in directions.iter().enumerate() {
                    check_finite(i, "direction", d)?;
                }
            }
            RayLayout::SharedDirection { origins, direction } => {
                check_finite(0, "direction", direction)?;
                for (i, o) in origins.iter().enumerate() {
                    check_finite(i, "origin", &o.coords)?;
                }
            }
            RayLayout::PerRay {
                origins,
                directions,
            } => {
                for (i, (o, d)) in origins.iter().zip(directions).enumerate() {
                    check_finite(i, "origin", &o.coords)?;
                    check_finite(i, "direction", d)?;
                }
            }
        }

        for (what, range) in [("t_min", &self.t_min), ("t_max", &self.t_max)] {
            if let Some(index) = range.iter().flatten().position(|t| t.is_nan()) {
                return Err(BatchError::NonFinite { index, what });
            }
        }

        Ok(())
    }

    /// Ray `index`, or `None` past the end.
    pub fn ray(&self, index: usize) -> Option<Ray> {
        if index >= self.len() {
            return None;
        }
        let (origin, direction) = match &self.layout {
            RayLayout::SharedOrigin { origin, directions } => (*origin, *directions.get(index)?),
            RayLayout::SharedDirection { origins, direction } => (*origins.get(index)?, *direction),
            RayLayout::PerRay {
                origins,
                directions,
            } => (*origins.get(index)?, *directions.get(index)?),
        };
        let t_min = match &self.t_min {
            Some(t) => *t.get(index)?,
            None => 0.0,
        };
        let t_max = match &self.t_max {
            Some(t) => *t.get(index)?,
            None => f64::INFINITY,
        };
        Some(Ray::with_range(origin, direction, t_min, t_max))
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(BatchError::LengthMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_finite(index: usize, what: &'static str, v: &Vec3) -> Result<()> {
    if !is_finite(v) {
        return Err(BatchError::NonFinite { index, what });
    }
    Ok(())
}

impl Bvh {
    /// Closest hit for every ray of the batch, in ray order.
    pub fn intersect_batch(&self, batch: &RayBatch) -> Result<Vec<Option<RayHit>>> {
        batch.validate()?;
        let hits: Vec<Option<RayHit>> = (0..batch.len())
            .into_par_iter()
            .map(|i| batch.ray(i).and_then(|ray| self.closest_hit(&ray)))
            .collect();

        debug!(
            rays = hits.len(),
            hits = hits.iter().filter(|h| h.is_some()).count(),
            "intersect batch"
        );
        Ok(hits)
    }

    /// Occlusion flag for every ray of the batch, in ray order.
    pub fn occlusion_batch(&self, batch: &RayBatch) -> Result<Vec<bool>> {
        batch.validate()?;
        let occluded: Vec<bool> = (0..batch.len())
            .into_par_iter()
            .map(|i| batch.ray(i).is_some_and(|ray| self.any_hit(&ray)))
            .collect();

        debug!(
            rays = occluded.len(),
            hits = occluded.iter().filter(|&&o| o).count(),
            "occlusion batch"
        );
        Ok(occluded)
    }
}
