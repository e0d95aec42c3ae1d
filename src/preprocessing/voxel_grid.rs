//! Voxel grid downsampling.
//!
//! Replaces all points falling into the same cubic cell with their centroid.
//! Output order is deterministic (sorted by cell index) so consecutive runs on
//! the same input produce the same cloud.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ensure_positive};
use crate::core::{Point3D, PointCloud};

/// Configuration for voxel downsampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelGridConfig {
    /// Edge length of a voxel cell in meters.
    /// Default: 0.01
    pub leaf_size: f32,
}

impl Default for VoxelGridConfig {
    fn default() -> Self {
        Self { leaf_size: 0.01 }
    }
}

impl VoxelGridConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("filter.voxel.leaf_size", self.leaf_size)
    }
}

type VoxelKey = (i64, i64, i64);

#[derive(Default, Clone, Copy)]
struct Accumulator {
    sum: [f64; 3],
    count: u32,
}

/// Voxel grid downsampler.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    config: VoxelGridConfig,
    inv_leaf: f64,
}

impl VoxelGrid {
    /// Create a downsampler.
    pub fn new(config: VoxelGridConfig) -> Self {
        Self {
            inv_leaf: 1.0 / config.leaf_size as f64,
            config,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &VoxelGridConfig {
        &self.config
    }

    #[inline]
    fn key(&self, p: &Point3D) -> VoxelKey {
        (
            (p.x as f64 * self.inv_leaf).floor() as i64,
            (p.y as f64 * self.inv_leaf).floor() as i64,
            (p.z as f64 * self.inv_leaf).floor() as i64,
        )
    }

    /// Apply downsampling, producing a new cloud in the same frame.
    ///
    /// Non-finite points are dropped.
    pub fn apply(&self, cloud: &PointCloud) -> PointCloud {
        if cloud.is_empty() {
            return cloud.derive(Vec::new());
        }

        let mut cells: HashMap<VoxelKey, Accumulator> = HashMap::with_capacity(cloud.len() / 4);
        for p in cloud.iter().filter(|p| p.is_finite()) {
            let acc = cells.entry(self.key(p)).or_default();
            acc.sum[0] += p.x as f64;
            acc.sum[1] += p.y as f64;
            acc.sum[2] += p.z as f64;
            acc.count += 1;
        }

        let mut entries: Vec<(VoxelKey, Accumulator)> = cells.into_iter().collect();
        entries.sort_unstable_by_key(|(k, _)| *k);

        let points = entries
            .into_iter()
            .map(|(_, acc)| {
                let n = acc.count as f64;
                Point3D::new(
                    (acc.sum[0] / n) as f32,
                    (acc.sum[1] / n) as f32,
                    (acc.sum[2] / n) as f32,
                )
            })
            .collect();

        cloud.derive(points)
    }
}

impl Default for VoxelGrid {
    fn default() -> Self {
        Self::new(VoxelGridConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dense_block(spacing: f32, n: i32) -> PointCloud {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    points.push(Point3D::new(
                        i as f32 * spacing + 0.0013,
                        j as f32 * spacing - 0.0007,
                        k as f32 * spacing + 0.0021,
                    ));
                }
            }
        }
        PointCloud::new("base_link", 7, points)
    }

    #[test]
    fn test_reduces_density() {
        let cloud = dense_block(0.002, 20); // 4cm block, 8000 points
        let out = VoxelGrid::new(VoxelGridConfig { leaf_size: 0.01 }).apply(&cloud);

        assert!(out.len() < cloud.len());
        // 4cm / 1cm leaf spans at most 5 cells per axis
        assert!(out.len() <= 125, "got {}", out.len());
        assert_eq!(out.frame(), cloud.frame());
        assert_eq!(out.stamp_us(), 7);
    }

    #[test]
    fn test_idempotent() {
        let cloud = dense_block(0.003, 25);
        let grid = VoxelGrid::new(VoxelGridConfig { leaf_size: 0.01 });

        let once = grid.apply(&cloud);
        let twice = grid.apply(&once);

        let diff = (once.len() as i64 - twice.len() as i64).abs();
        assert!(diff <= (once.len() as i64 / 100).max(1), "{} vs {}", once.len(), twice.len());
    }

    #[test]
    fn test_single_cell_yields_centroid() {
        let cloud = PointCloud::new(
            "base_link",
            0,
            vec![
                Point3D::new(0.001, 0.001, 0.001),
                Point3D::new(0.003, 0.005, 0.007),
            ],
        );
        let out = VoxelGrid::new(VoxelGridConfig { leaf_size: 0.01 }).apply(&cloud);

        assert_eq!(out.len(), 1);
        assert_relative_eq!(out.points()[0].x, 0.002, epsilon = 1e-6);
        assert_relative_eq!(out.points()[0].y, 0.003, epsilon = 1e-6);
        assert_relative_eq!(out.points()[0].z, 0.004, epsilon = 1e-6);
    }

    #[test]
    fn test_deterministic_order() {
        let cloud = dense_block(0.004, 15);
        let grid = VoxelGrid::default();
        assert_eq!(grid.apply(&cloud), grid.apply(&cloud));
    }

    #[test]
    fn test_empty_and_non_finite() {
        let grid = VoxelGrid::default();
        assert!(grid.apply(&PointCloud::empty("base_link", 0)).is_empty());

        let cloud = PointCloud::new(
            "base_link",
            0,
            vec![Point3D::new(f32::NAN, 0.0, 0.0), Point3D::new(0.0, 0.0, 0.0)],
        );
        assert_eq!(grid.apply(&cloud).len(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(VoxelGridConfig::default().validate().is_ok());
        assert!(VoxelGridConfig { leaf_size: -0.01 }.validate().is_err());
        assert!(VoxelGridConfig { leaf_size: 0.0 }.validate().is_err());
    }
}
