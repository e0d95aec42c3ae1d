//! Object candidates produced by clustering.

use crate::core::{Bounds3D, FrameId, Point3D, PointCloud};
use crate::transform::{TransformError, TransformSnapshot};

/// One spatially coherent cluster plus its bounding geometry.
///
/// Transient: lives only within a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectCandidate {
    /// Index of the cluster within its run.
    pub index: usize,
    cloud: PointCloud,
    bounds: Bounds3D,
    centroid: Point3D,
}

impl ObjectCandidate {
    /// Build a candidate from its points. `None` for an empty cloud.
    pub fn new(index: usize, cloud: PointCloud) -> Option<Self> {
        let bounds = cloud.bounds()?;
        let centroid = cloud.centroid()?;
        Some(Self {
            index,
            cloud,
            bounds,
            centroid,
        })
    }

    /// Frame the points are expressed in.
    pub fn frame(&self) -> &FrameId {
        self.cloud.frame()
    }

    /// The cluster's points.
    pub fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// Points as a slice.
    pub fn points(&self) -> &[Point3D] {
        self.cloud.points()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// Always false for a constructed candidate.
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// Axis-aligned bounds.
    pub fn bounds(&self) -> &Bounds3D {
        &self.bounds
    }

    /// Mean point.
    pub fn centroid(&self) -> Point3D {
        self.centroid
    }

    /// Express the candidate in the snapshot's target frame.
    ///
    /// A no-op when the candidate is already there.
    pub fn into_frame(self, snapshot: &TransformSnapshot) -> Result<Self, TransformError> {
        if self.frame() == snapshot.target() {
            return Ok(self);
        }
        let cloud = snapshot.apply_cloud(&self.cloud)?;
        debug_assert_eq!(cloud.len(), self.cloud.len());
        let mut bounds = Bounds3D::empty();
        for p in cloud.iter() {
            bounds.expand(p);
        }
        Ok(Self {
            index: self.index,
            centroid: snapshot.apply_point(&self.centroid),
            bounds,
            cloud,
        })
    }
}
