//! Frame-tagged 3D point cloud.
//!
//! A [`PointCloud`] is immutable once created: every pipeline stage derives a
//! new cloud (same frame and stamp unless a transform says otherwise) instead
//! of editing points in place.

use nalgebra::Isometry3;

use super::frame::FrameId;
use super::point::{Bounds3D, Point3D};

/// Ordered sequence of 3D points expressed in a named frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    frame: FrameId,
    stamp_us: u64,
    points: Vec<Point3D>,
}

impl PointCloud {
    /// Create a cloud from points captured in `frame` at `stamp_us`.
    pub fn new(frame: impl Into<FrameId>, stamp_us: u64, points: Vec<Point3D>) -> Self {
        Self {
            frame: frame.into(),
            stamp_us,
            points,
        }
    }

    /// Empty cloud in `frame`.
    pub fn empty(frame: impl Into<FrameId>, stamp_us: u64) -> Self {
        Self::new(frame, stamp_us, Vec::new())
    }

    /// Frame the points are expressed in.
    #[inline]
    pub fn frame(&self) -> &FrameId {
        &self.frame
    }

    /// Capture timestamp in microseconds.
    #[inline]
    pub fn stamp_us(&self) -> u64 {
        self.stamp_us
    }

    /// Points in capture order.
    #[inline]
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over points.
    pub fn iter(&self) -> impl Iterator<Item = &Point3D> {
        self.points.iter()
    }

    /// Derive a new cloud with the same frame and stamp.
    pub fn derive(&self, points: Vec<Point3D>) -> PointCloud {
        PointCloud {
            frame: self.frame.clone(),
            stamp_us: self.stamp_us,
            points,
        }
    }

    /// Derive a cloud holding the points at `indices` (in the given order).
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        self.derive(indices.iter().filter_map(|&i| self.points.get(i).copied()).collect())
    }

    /// Derive a cloud holding all points for which `keep` is true.
    pub fn retain<F>(&self, mut keep: F) -> PointCloud
    where
        F: FnMut(&Point3D) -> bool,
    {
        self.derive(self.points.iter().filter(|p| keep(p)).copied().collect())
    }

    /// Apply a rigid transform, producing a cloud in `target` frame.
    pub fn transformed(&self, transform: &Isometry3<f32>, target: &FrameId) -> PointCloud {
        let points = self
            .points
            .iter()
            .map(|p| Point3D::from_point3(&(transform * p.to_point3())))
            .collect();
        PointCloud {
            frame: target.clone(),
            stamp_us: self.stamp_us,
            points,
        }
    }

    /// Axis-aligned bounds (`None` for an empty cloud).
    pub fn bounds(&self) -> Option<Bounds3D> {
        Bounds3D::from_points(&self.points)
    }

    /// Mean of all points (`None` for an empty cloud).
    pub fn centroid(&self) -> Option<Point3D> {
        super::math::centroid(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};

    fn sample_cloud() -> PointCloud {
        PointCloud::new(
            "camera",
            1_000,
            vec![
                Point3D::new(0.0, 0.0, 0.0),
                Point3D::new(1.0, 0.0, 0.0),
                Point3D::new(0.0, 2.0, 0.0),
            ],
        )
    }

    #[test]
    fn test_derive_keeps_frame_and_stamp() {
        let cloud = sample_cloud();
        let derived = cloud.derive(vec![Point3D::new(5.0, 5.0, 5.0)]);

        assert_eq!(derived.frame(), cloud.frame());
        assert_eq!(derived.stamp_us(), 1_000);
        assert_eq!(derived.len(), 1);
        // Source untouched
        assert_eq!(cloud.len(), 3);
    }

    #[test]
    fn test_select_and_retain() {
        let cloud = sample_cloud();

        let selected = cloud.select(&[2, 0, 99]);
        assert_eq!(selected.points(), &[cloud.points()[2], cloud.points()[0]]);

        let retained = cloud.retain(|p| p.x > 0.5);
        assert_eq!(retained.len(), 1);
    }

    #[test]
    fn test_transformed_changes_frame() {
        let cloud = sample_cloud();
        let iso = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 1.0),
            UnitQuaternion::identity(),
        );
        let target = FrameId::new("base_link");

        let moved = cloud.transformed(&iso, &target);

        assert_eq!(moved.frame(), &target);
        assert_eq!(moved.points()[1], Point3D::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_empty_cloud() {
        let cloud = PointCloud::empty("camera", 0);
        assert!(cloud.is_empty());
        assert!(cloud.bounds().is_none());
        assert!(cloud.centroid().is_none());
    }
}
