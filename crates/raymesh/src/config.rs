//! Build configuration.

use raymesh_bvh::{IntersectionMode, Quality};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};

/// Largest accepted `max_leaf_size`.
const LEAF_SIZE_LIMIT: usize = 64;

/// How to build the acceleration structure.
///
/// ```
/// use raymesh::{BuildConfig, Quality};
///
/// let config = BuildConfig::parse("high", true).unwrap();
/// assert_eq!(config.quality, Quality::High);
/// assert!(BuildConfig::parse("best", false).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Split strategy.
    pub quality: Quality,
    /// Use the watertight kernel instead of the fast one.
    pub robust: bool,
    /// Largest node the builder may keep as a leaf (2..=64).
    pub max_leaf_size: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            quality: Quality::Medium,
            robust: false,
            max_leaf_size: 8,
        }
    }
}

impl BuildConfig {
    /// Config from a quality name (`"low"`, `"medium"` or `"high"`).
    pub fn parse(quality: &str, robust: bool) -> Result<Self> {
        Ok(Self {
            quality: quality.parse()?,
            robust,
            ..Self::default()
        })
    }

    /// Same config with a different quality.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Same config with the watertight kernel switched on or off.
    pub fn with_robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    /// Kernel selected by [`robust`](Self::robust).
    pub fn mode(&self) -> IntersectionMode {
        if self.robust {
            IntersectionMode::Watertight
        } else {
            IntersectionMode::Fast
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(2..=LEAF_SIZE_LIMIT).contains(&self.max_leaf_size) {
            return Err(MeshError::InvalidConfig(format!(
                "max_leaf_size must be between 2 and {LEAF_SIZE_LIMIT}, got {}",
                self.max_leaf_size
            )));
        }
        Ok(())
    }
}
