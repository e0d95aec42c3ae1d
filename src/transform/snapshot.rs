//! A captured frame-to-frame transform.

use nalgebra::{Isometry3, UnitQuaternion};

use super::error::TransformError;
use crate::core::{FrameId, Point3D, PointCloud};

/// Rigid transform mapping points expressed in `source` into `target`,
/// stamped with the time it was valid.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSnapshot {
    source: FrameId,
    target: FrameId,
    transform: Isometry3<f32>,
    stamp_us: u64,
    is_static: bool,
}

impl TransformSnapshot {
    /// Create a snapshot.
    pub fn new(
        source: impl Into<FrameId>,
        target: impl Into<FrameId>,
        transform: Isometry3<f32>,
        stamp_us: u64,
        is_static: bool,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            transform,
            stamp_us,
            is_static,
        }
    }

    /// Identity snapshot for a frame onto itself. Never stale.
    pub fn identity(frame: &FrameId) -> Self {
        Self::new(frame.clone(), frame.clone(), Isometry3::identity(), 0, true)
    }

    /// Frame the transform reads from.
    pub fn source(&self) -> &FrameId {
        &self.source
    }

    /// Frame the transform writes into.
    pub fn target(&self) -> &FrameId {
        &self.target
    }

    /// The transform `target_T_source`.
    pub fn transform(&self) -> &Isometry3<f32> {
        &self.transform
    }

    /// Rotation part.
    pub fn rotation(&self) -> &UnitQuaternion<f32> {
        &self.transform.rotation
    }

    /// Time the transform was valid, microseconds.
    pub fn stamp_us(&self) -> u64 {
        self.stamp_us
    }

    /// Static transforms never go stale.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Age at `now_us` (zero for static snapshots).
    pub fn age_us(&self, now_us: u64) -> u64 {
        if self.is_static {
            0
        } else {
            now_us.saturating_sub(self.stamp_us)
        }
    }

    /// Map a point from `source` to `target`.
    pub fn apply_point(&self, p: &Point3D) -> Point3D {
        Point3D::from_point3(&(self.transform * p.to_point3()))
    }

    /// Express a cloud in `target`. The cloud must be in `source`.
    pub fn apply_cloud(&self, cloud: &PointCloud) -> Result<PointCloud, TransformError> {
        self.check_source(cloud.frame())?;
        if self.source == self.target {
            return Ok(cloud.clone());
        }
        Ok(cloud.transformed(&self.transform, &self.target))
    }

    /// Fail unless `frame` is this snapshot's source.
    pub fn check_source(&self, frame: &FrameId) -> Result<(), TransformError> {
        if frame == &self.source {
            Ok(())
        } else {
            Err(TransformError::FrameMismatch {
                expected: self.source.clone(),
                actual: frame.clone(),
            })
        }
    }

    /// The reverse snapshot (`source_T_target`).
    pub fn inverse(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            transform: self.transform.inverse(),
            stamp_us: self.stamp_us,
            is_static: self.is_static,
        }
    }
}
