//! Passthrough (crop box) filter.
//!
//! Keeps only points inside the axis-aligned workspace region in front of
//! the robot. Everything outside is treated as background or sensor noise.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ensure_finite, ensure_positive};
use crate::core::{Bounds3D, Point3D, PointCloud};

/// Configuration for the crop box.
///
/// The region is centered on `(center_x, center_y)` in the frame the cloud is
/// expressed in:
/// - x ∈ [center_x − depth/2, center_x + depth/2]
/// - y ∈ [center_y − half_width, center_y + half_width]
/// - z ∈ [min_z, max_z]
///
/// All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropBoxConfig {
    /// Region center along X (meters).
    pub center_x: f32,
    /// Region center along Y (meters).
    pub center_y: f32,
    /// Half of the lateral (Y) extent in meters.
    /// Default: 0.5
    pub half_width: f32,
    /// Full forward (X) extent in meters.
    /// Default: 1.2
    pub depth: f32,
    /// Lowest kept Z in meters. Must admit the support surface.
    /// Default: -0.05
    pub min_z: f32,
    /// Highest kept Z in meters.
    /// Default: 0.5
    pub max_z: f32,
}

impl Default for CropBoxConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            half_width: 0.5,
            depth: 1.2,
            min_z: -0.05,
            max_z: 0.5,
        }
    }
}

impl CropBoxConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_finite("filter.crop.center_x", self.center_x)?;
        ensure_finite("filter.crop.center_y", self.center_y)?;
        ensure_positive("filter.crop.half_width", self.half_width)?;
        ensure_positive("filter.crop.depth", self.depth)?;
        ensure_finite("filter.crop.min_z", self.min_z)?;
        ensure_finite("filter.crop.max_z", self.max_z)?;
        if self.min_z >= self.max_z {
            return Err(ConfigError::invalid(
                "filter.crop.min_z",
                format!("must be below max_z ({} >= {})", self.min_z, self.max_z),
            ));
        }
        Ok(())
    }

    /// The region as an axis-aligned box.
    pub fn bounds(&self) -> Bounds3D {
        Bounds3D::new(
            Point3D::new(
                self.center_x - self.depth * 0.5,
                self.center_y - self.half_width,
                self.min_z,
            ),
            Point3D::new(
                self.center_x + self.depth * 0.5,
                self.center_y + self.half_width,
                self.max_z,
            ),
        )
    }
}

/// Crop box filter.
#[derive(Debug, Clone)]
pub struct CropBox {
    config: CropBoxConfig,
    bounds: Bounds3D,
}

impl CropBox {
    /// Create a crop box filter.
    pub fn new(config: CropBoxConfig) -> Self {
        Self {
            bounds: config.bounds(),
            config,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &CropBoxConfig {
        &self.config
    }

    /// Check a single point. Non-finite points are never inside.
    #[inline]
    pub fn contains(&self, p: &Point3D) -> bool {
        p.is_finite() && self.bounds.contains(p)
    }

    /// Apply the filter, producing a new cloud in the same frame.
    pub fn apply(&self, cloud: &PointCloud) -> PointCloud {
        cloud.retain(|p| self.contains(p))
    }
}

impl Default for CropBox {
    fn default() -> Self {
        Self::new(CropBoxConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_cloud() -> PointCloud {
        // 2m cube of points at 0.1m spacing centered on the origin
        let mut points = Vec::new();
        for i in -10..=10 {
            for j in -10..=10 {
                for k in -10..=10 {
                    points.push(Point3D::new(i as f32 * 0.1, j as f32 * 0.1, k as f32 * 0.1));
                }
            }
        }
        PointCloud::new("base_link", 0, points)
    }

    #[test]
    fn test_no_leakage_default_bounds() {
        let crop = CropBox::default();
        let out = crop.apply(&grid_cloud());
        let b = crop.config().bounds();

        assert!(!out.is_empty());
        for p in out.points() {
            assert!(b.contains(p), "leaked point {:?}", p);
        }
    }

    #[test]
    fn test_no_leakage_across_configs() {
        let cloud = grid_cloud();
        let configs = [
            CropBoxConfig {
                center_x: 0.3,
                center_y: -0.2,
                half_width: 0.25,
                depth: 0.4,
                min_z: 0.0,
                max_z: 0.3,
            },
            CropBoxConfig {
                center_x: -0.5,
                center_y: 0.5,
                half_width: 0.05,
                depth: 0.05,
                min_z: -1.0,
                max_z: 1.0,
            },
            CropBoxConfig {
                half_width: 5.0,
                depth: 10.0,
                min_z: -5.0,
                max_z: 5.0,
                ..CropBoxConfig::default()
            },
        ];

        for config in configs {
            let out = CropBox::new(config).apply(&cloud);
            let b = config.bounds();
            for p in out.points() {
                assert!(
                    p.x >= b.min.x
                        && p.x <= b.max.x
                        && p.y >= b.min.y
                        && p.y <= b.max.y
                        && p.z >= b.min.z
                        && p.z <= b.max.z
                );
            }
        }
    }

    #[test]
    fn test_large_box_keeps_everything() {
        let cloud = grid_cloud();
        let crop = CropBox::new(CropBoxConfig {
            half_width: 5.0,
            depth: 10.0,
            min_z: -5.0,
            max_z: 5.0,
            ..CropBoxConfig::default()
        });
        assert_eq!(crop.apply(&cloud).len(), cloud.len());
    }

    #[test]
    fn test_empty_result_is_valid() {
        let cloud = PointCloud::new("base_link", 0, vec![Point3D::new(10.0, 10.0, 10.0)]);
        let out = CropBox::default().apply(&cloud);
        assert!(out.is_empty());
        assert_eq!(out.frame(), cloud.frame());
    }

    #[test]
    fn test_rejects_non_finite() {
        let cloud = PointCloud::new(
            "base_link",
            0,
            vec![
                Point3D::new(f32::NAN, 0.0, 0.1),
                Point3D::new(0.0, f32::INFINITY, 0.1),
                Point3D::new(0.0, 0.0, 0.1),
            ],
        );
        assert_eq!(CropBox::default().apply(&cloud).len(), 1);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let crop = CropBox::default();
        assert!(crop.contains(&Point3D::new(0.6, 0.5, 0.5)));
        assert!(!crop.contains(&Point3D::new(0.6001, 0.0, 0.0)));
    }

    #[test]
    fn test_validate() {
        assert!(CropBoxConfig::default().validate().is_ok());

        let inverted = CropBoxConfig {
            min_z: 1.0,
            max_z: 0.0,
            ..CropBoxConfig::default()
        };
        assert!(inverted.validate().is_err());

        let negative = CropBoxConfig {
            half_width: -0.1,
            ..CropBoxConfig::default()
        };
        assert!(negative.validate().is_err());
    }
}
