//! Geometric filter stage.
//!
//! Bounds the working set to the robot's workspace and evens out point
//! density before segmentation.
//!
//! # Pipeline
//!
//! ```text
//! PointCloud (reference frame) → CropBox → VoxelGrid → PointCloud
//! ```
//!
//! Both filters implement [`CloudFilter`]; [`GeometricFilter`] chains them in
//! the fixed order above. An empty result is a valid outcome.

mod crop_box;
mod voxel_grid;

pub use crop_box::{CropBox, CropBoxConfig};
pub use voxel_grid::{VoxelGrid, VoxelGridConfig};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::PointCloud;

/// Trait for point cloud filtering operations.
///
/// Filters never mutate their input and always return a cloud in the same
/// frame.
pub trait CloudFilter: Send + Sync {
    /// Apply the filter, returning a new cloud.
    fn filter(&self, cloud: &PointCloud) -> PointCloud;

    /// Name of this filter for diagnostics.
    fn name(&self) -> &'static str;
}

impl CloudFilter for CropBox {
    fn filter(&self, cloud: &PointCloud) -> PointCloud {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "CropBox"
    }
}

impl CloudFilter for VoxelGrid {
    fn filter(&self, cloud: &PointCloud) -> PointCloud {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "VoxelGrid"
    }
}

/// Configuration for the geometric filter stage (`[filter]` section).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Crop box bounds.
    pub crop: CropBoxConfig,
    /// Voxel downsampling.
    pub voxel: VoxelGridConfig,
}

impl FilterConfig {
    /// Validate both sub-sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crop.validate()?;
        self.voxel.validate()
    }
}

/// Point counts through the filter stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Points entering the stage.
    pub input: usize,
    /// Points left after cropping.
    pub cropped: usize,
    /// Points left after downsampling.
    pub downsampled: usize,
}

/// Crop then downsample.
#[derive(Debug, Clone)]
pub struct GeometricFilter {
    crop: CropBox,
    voxel: VoxelGrid,
}

impl GeometricFilter {
    /// Create the stage from configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self {
            crop: CropBox::new(config.crop),
            voxel: VoxelGrid::new(config.voxel),
        }
    }

    /// Run the cloud through both filters.
    pub fn process(&self, cloud: &PointCloud) -> (PointCloud, FilterStats) {
        let cropped = self.crop.filter(cloud);
        let downsampled = if cropped.is_empty() {
            cropped.clone()
        } else {
            self.voxel.filter(&cropped)
        };

        let stats = FilterStats {
            input: cloud.len(),
            cropped: cropped.len(),
            downsampled: downsampled.len(),
        };
        log::trace!(
            "{} {} -> {} -> {} points",
            self.crop.name(),
            stats.input,
            stats.cropped,
            stats.downsampled
        );
        (downsampled, stats)
    }

    /// The crop box in use.
    pub fn crop(&self) -> &CropBox {
        &self.crop
    }
}

impl Default for GeometricFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point3D;

    #[test]
    fn test_crop_then_downsample() {
        let mut points = Vec::new();
        // Dense patch inside the workspace
        for i in 0..20 {
            for j in 0..20 {
                points.push(Point3D::new(i as f32 * 0.002, j as f32 * 0.002, 0.1));
            }
        }
        // Far-away noise
        points.push(Point3D::new(3.0, 0.0, 0.1));
        points.push(Point3D::new(0.0, 0.0, 2.0));
        let cloud = PointCloud::new("base_link", 0, points);

        let (out, stats) = GeometricFilter::default().process(&cloud);

        assert_eq!(stats.input, 402);
        assert_eq!(stats.cropped, 400);
        assert!(stats.downsampled < stats.cropped);
        assert_eq!(out.len(), stats.downsampled);
        let bounds = CropBoxConfig::default().bounds();
        assert!(out.iter().all(|p| bounds.contains(p)));
    }

    #[test]
    fn test_empty_after_crop_is_not_an_error() {
        let cloud = PointCloud::new("base_link", 0, vec![Point3D::new(5.0, 5.0, 5.0)]);
        let (out, stats) = GeometricFilter::default().process(&cloud);
        assert!(out.is_empty());
        assert_eq!(stats.cropped, 0);
        assert_eq!(stats.downsampled, 0);
    }

    #[test]
    fn test_filter_trait_names() {
        let filters: Vec<Box<dyn CloudFilter>> =
            vec![Box::new(CropBox::default()), Box::new(VoxelGrid::default())];
        let names: Vec<&str> = filters.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["CropBox", "VoxelGrid"]);
    }
}
