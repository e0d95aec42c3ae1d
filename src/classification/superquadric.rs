//! Superquadric surface model.
//!
//! Exponents use the "squareness" convention: `1.0` is an elliptical
//! profile, larger values approach a rectangular profile. In the local frame
//! the inside–outside function is
//!
//! ```text
//! F(x, y, z) = (|x/a1|^(2·e2) + |y/a2|^(2·e2))^(e1/e2) + |z/a3|^(2·e1)
//! ```
//!
//! with `F < 1` inside, `F = 1` on the surface and `F > 1` outside. `e1`
//! shapes the north–south (z) profile, `e2` the east–west (xy) cross-section.
//!
//! - sphere: `e1 = e2 = 1`, equal scales
//! - cylinder (axis z): `e1` large, `e2 = 1`
//! - cube: both large

use nalgebra::{UnitQuaternion, Vector3};

use crate::core::{FrameId, Point3D};

/// Inside–outside function at a local-frame point.
pub fn inside_outside(local: &Vector3<f64>, scale: &[f64; 3], e1: f64, e2: f64) -> f64 {
    let xy = (local.x / scale[0]).abs().powf(2.0 * e2) + (local.y / scale[1]).abs().powf(2.0 * e2);
    xy.powf(e1 / e2) + (local.z / scale[2]).abs().powf(2.0 * e1)
}

/// Signed radial distance from a local-frame point to the surface, measured
/// along the ray from the center. Positive outside.
///
/// `F` is homogeneous of degree `2·e1`, so the surface point on the ray is
/// `p · F^(−1/(2·e1))`.
pub fn radial_distance(local: &Vector3<f64>, scale: &[f64; 3], e1: f64, e2: f64) -> f64 {
    let norm = local.norm();
    let f = inside_outside(local, scale, e1, e2);
    if !f.is_finite() {
        return norm;
    }
    if f <= f64::MIN_POSITIVE {
        // At the center: nearest surface is roughly the smallest semi-axis
        return -scale[0].min(scale[1]).min(scale[2]);
    }
    norm * (1.0 - f.powf(-0.5 / e1))
}

/// A superquadric fitted to one candidate, expressed in `frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperquadricFit {
    /// Frame the pose is expressed in.
    pub frame: FrameId,
    /// Center.
    pub position: Point3D,
    /// Rotation from the model's local frame into `frame`.
    pub orientation: UnitQuaternion<f32>,
    /// Semi-axes along local x, y, z (meters).
    pub scale: [f32; 3],
    /// North–south exponent (z profile), strictly positive.
    pub e1: f32,
    /// East–west exponent (xy cross-section), strictly positive.
    pub e2: f32,
    /// RMS radial distance divided by the mean semi-axis.
    pub residual: f32,
    /// Points the fit was computed from.
    pub support: usize,
}

impl SuperquadricFit {
    /// Full box size along each local axis.
    pub fn extent(&self) -> [f32; 3] {
        [self.scale[0] * 2.0, self.scale[1] * 2.0, self.scale[2] * 2.0]
    }

    /// Mean semi-axis.
    pub fn mean_scale(&self) -> f32 {
        (self.scale[0] + self.scale[1] + self.scale[2]) / 3.0
    }

    /// Semi-axes sorted ascending.
    pub fn sorted_scale(&self) -> [f32; 3] {
        let mut s = self.scale;
        s.sort_by(f32::total_cmp);
        s
    }

    /// Map a local-frame point into `frame`.
    pub fn to_frame(&self, local: &Vector3<f32>) -> Point3D {
        Point3D::from_vector(&(self.orientation * local + self.position.to_vector()))
    }

    /// The eight corners of the oriented bounding box, in `frame`.
    pub fn corners(&self) -> [Point3D; 8] {
        let [a, b, c] = self.scale;
        let mut out = [Point3D::origin(); 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -a } else { a };
            let sy = if i & 2 == 0 { -b } else { b };
            let sz = if i & 4 == 0 { -c } else { c };
            *corner = self.to_frame(&Vector3::new(sx, sy, sz));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_surface() {
        let scale = [0.5, 0.5, 0.5];
        let on = Vector3::new(0.3, 0.4, 0.0);
        assert_relative_eq!(inside_outside(&on, &scale, 1.0, 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(radial_distance(&on, &scale, 1.0, 1.0), 0.0, epsilon = 1e-12);

        let out = Vector3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(radial_distance(&out, &scale, 1.0, 1.0), 0.5, epsilon = 1e-12);

        let inside = Vector3::new(0.25, 0.0, 0.0);
        assert_relative_eq!(radial_distance(&inside, &scale, 1.0, 1.0), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_box_like_surface() {
        let scale = [1.0, 1.0, 1.0];
        // Face center is on the surface for any exponent
        let face = Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(radial_distance(&face, &scale, 10.0, 10.0), 0.0, epsilon = 1e-12);
        // A point on a cube edge is nearly on the surface for large exponents
        let edge = Vector3::new(1.0, 1.0, 0.0);
        let d_square = radial_distance(&edge, &scale, 10.0, 10.0).abs();
        let d_round = radial_distance(&edge, &scale, 1.0, 1.0).abs();
        assert!(d_square < 0.2 * d_round);
    }

    #[test]
    fn test_cylinder_profile() {
        // Axis z, radius 1, half-height 2
        let scale = [1.0, 1.0, 2.0];
        let rim = Vector3::new(1.0, 0.0, 1.9);
        assert!(radial_distance(&rim, &scale, 10.0, 1.0).abs() < 0.1);
        assert!(radial_distance(&rim, &scale, 1.0, 1.0).abs() > 0.3);
    }

    #[test]
    fn test_center_point() {
        let scale = [0.2, 0.3, 0.4];
        assert_relative_eq!(radial_distance(&Vector3::zeros(), &scale, 1.0, 1.0), -0.2);
    }

    #[test]
    fn test_corners() {
        let fit = SuperquadricFit {
            frame: FrameId::new("base_link"),
            position: Point3D::new(1.0, 0.0, 0.0),
            orientation: UnitQuaternion::identity(),
            scale: [0.1, 0.2, 0.3],
            e1: 1.0,
            e2: 1.0,
            residual: 0.0,
            support: 0,
        };
        let corners = fit.corners();
        assert_relative_eq!(corners[0].x, 0.9, epsilon = 1e-6);
        assert_relative_eq!(corners[0].y, -0.2, epsilon = 1e-6);
        assert_relative_eq!(corners[0].z, -0.3, epsilon = 1e-6);
        assert_relative_eq!(corners[7].x, 1.1, epsilon = 1e-6);
        assert_relative_eq!(corners[7].z, 0.3, epsilon = 1e-6);
        assert_eq!(fit.extent(), [0.2, 0.4, 0.6]);
        assert_eq!(fit.sorted_scale(), [0.1, 0.2, 0.3]);
    }
}
