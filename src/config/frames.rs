//! Frame names and transform staleness.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::core::FrameId;

/// `[frames]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesSection {
    /// Fixed frame all objects are reported in.
    pub reference_frame: FrameId,
    /// Frame of the incoming point cloud.
    pub cloud_frame: FrameId,
    /// Frame of the color camera.
    pub color_frame: FrameId,
    /// Frame of the depth camera.
    pub depth_frame: FrameId,
    /// Oldest usable sensor → reference transform (milliseconds).
    pub max_transform_age_ms: u64,
}

impl Default for FramesSection {
    fn default() -> Self {
        Self {
            reference_frame: FrameId::new("base_link"),
            cloud_frame: FrameId::new("camera_depth_optical_frame"),
            color_frame: FrameId::new("camera_color_optical_frame"),
            depth_frame: FrameId::new("camera_depth_optical_frame"),
            max_transform_age_ms: 500,
        }
    }
}

impl FramesSection {
    /// Validate names and bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, frame) in [
            ("frames.reference_frame", &self.reference_frame),
            ("frames.cloud_frame", &self.cloud_frame),
            ("frames.color_frame", &self.color_frame),
            ("frames.depth_frame", &self.depth_frame),
        ] {
            if frame.is_empty() {
                return Err(ConfigError::invalid(field, "frame name must not be empty"));
            }
        }
        if self.max_transform_age_ms == 0 {
            return Err(ConfigError::invalid(
                "frames.max_transform_age_ms",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
