//! Recognized objects.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::classification::{ShapeLabel, SuperquadricFit};
use crate::core::{FrameId, Point3D};

/// Registry-assigned object identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A classified object.
///
/// Created from an accepted fit; owned by the registry once inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedObject {
    /// Identity (assigned on insert; `ObjectId(0)` before that).
    pub id: ObjectId,
    /// Primitive family.
    pub label: ShapeLabel,
    /// Frame `position` and `orientation` are expressed in.
    pub frame: FrameId,
    /// Center.
    pub position: Point3D,
    /// Rotation of the object's box axes.
    pub orientation: UnitQuaternion<f32>,
    /// Full box size along the object's axes (meters).
    pub extent: [f32; 3],
    /// Shape exponents of the latest fit.
    pub exponents: [f32; 2],
    /// Relative residual of the latest fit.
    pub residual: f32,
    /// Number of detections merged into this entry.
    pub observations: u32,
    /// Stamp of the first detection (µs).
    pub first_seen_us: u64,
    /// Stamp of the latest detection (µs).
    pub last_seen_us: u64,
}

impl RecognizedObject {
    /// Build an unregistered object from an accepted fit.
    pub fn from_fit(label: ShapeLabel, fit: &SuperquadricFit, stamp_us: u64) -> Self {
        Self {
            id: ObjectId(0),
            label,
            frame: fit.frame.clone(),
            position: fit.position,
            orientation: fit.orientation,
            extent: fit.extent(),
            exponents: [fit.e1, fit.e2],
            residual: fit.residual,
            observations: 1,
            first_seen_us: stamp_us,
            last_seen_us: stamp_us,
        }
    }

    /// Distance between centers.
    pub fn distance(&self, other: &RecognizedObject) -> f32 {
        self.position.distance(&other.position)
    }

    /// The eight corners of the oriented bounding box, in `frame`.
    pub fn corners(&self) -> [Point3D; 8] {
        let half = [self.extent[0] * 0.5, self.extent[1] * 0.5, self.extent[2] * 0.5];
        let center = self.position.to_vector();
        let mut out = [Point3D::origin(); 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let local = Vector3::new(
                if i & 1 == 0 { -half[0] } else { half[0] },
                if i & 2 == 0 { -half[1] } else { half[1] },
                if i & 4 == 0 { -half[2] } else { half[2] },
            );
            *corner = Point3D::from_vector(&(self.orientation * local + center));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fit() {
        let fit = SuperquadricFit {
            frame: FrameId::new("base_link"),
            position: Point3D::new(0.3, 0.0, 0.1),
            orientation: UnitQuaternion::identity(),
            scale: [0.05, 0.05, 0.05],
            e1: 1.0,
            e2: 1.0,
            residual: 0.01,
            support: 200,
        };
        let obj = RecognizedObject::from_fit(ShapeLabel::Sphere, &fit, 42);

        assert_eq!(obj.extent, [0.1, 0.1, 0.1]);
        assert_eq!(obj.frame.as_str(), "base_link");
        assert_eq!(obj.observations, 1);
        assert_eq!(obj.first_seen_us, 42);
        assert_eq!(ObjectId(7).to_string(), "#7");

        let corners = obj.corners();
        assert_eq!(corners, fit.corners());
        assert!(corners.iter().all(|c| (c.z - 0.1).abs() <= 0.05 + 1e-6));
    }
}
