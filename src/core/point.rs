//! 3D point and axis-aligned bounds.

use std::ops::{Add, Mul, Sub};

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    /// X coordinate in meters.
    pub x: f32,
    /// Y coordinate in meters.
    pub y: f32,
    /// Z coordinate in meters.
    pub z: f32,
}

impl Point3D {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    #[inline]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Euclidean norm (distance from origin).
    #[inline]
    pub fn norm(&self) -> f32 {
        self.norm_squared().sqrt()
    }

    /// Squared Euclidean norm.
    #[inline]
    pub fn norm_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point3D) -> f32 {
        (*self - *other).norm()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(&self, other: &Point3D) -> f32 {
        (*self - *other).norm_squared()
    }

    /// Dot product treating both points as vectors.
    #[inline]
    pub fn dot(&self, other: &Point3D) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// True if all coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Linear interpolation towards `other` by `t` (0 = self, 1 = other).
    #[inline]
    pub fn lerp(&self, other: &Point3D, t: f32) -> Point3D {
        *self + (*other - *self) * t
    }

    /// Convert to an nalgebra vector.
    #[inline]
    pub fn to_vector(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Convert to an nalgebra point.
    #[inline]
    pub fn to_point3(&self) -> Point3<f32> {
        Point3::new(self.x, self.y, self.z)
    }

    /// Build from an nalgebra vector.
    #[inline]
    pub fn from_vector(v: &Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Build from an nalgebra point.
    #[inline]
    pub fn from_point3(p: &Point3<f32>) -> Self {
        Self::new(p.x, p.y, p.z)
    }

    /// As a plain array (used for spatial indexing).
    #[inline]
    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Point3D {
    type Output = Point3D;

    #[inline]
    fn add(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Point3D;

    #[inline]
    fn sub(self, rhs: Point3D) -> Point3D {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Point3D {
    type Output = Point3D;

    #[inline]
    fn mul(self, rhs: f32) -> Point3D {
        Point3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3D {
    /// Minimum corner.
    pub min: Point3D,
    /// Maximum corner.
    pub max: Point3D,
}

impl Bounds3D {
    /// Create bounds from two corners.
    pub fn new(min: Point3D, max: Point3D) -> Self {
        Self { min, max }
    }

    /// Empty bounds (min = +inf, max = -inf). Expands on first point.
    pub fn empty() -> Self {
        Self {
            min: Point3D::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3D::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Bounds of a point set. Returns `None` for an empty set.
    pub fn from_points(points: &[Point3D]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand(p);
        }
        Some(bounds)
    }

    /// Grow to include a point.
    #[inline]
    pub fn expand(&mut self, p: &Point3D) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// True if no point was ever added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Size along each axis.
    pub fn extent(&self) -> Point3D {
        if self.is_empty() {
            return Point3D::origin();
        }
        self.max - self.min
    }

    /// Box center.
    pub fn center(&self) -> Point3D {
        self.min.lerp(&self.max, 0.5)
    }

    /// Inclusive containment test.
    #[inline]
    pub fn contains(&self, p: &Point3D) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_arithmetic() {
        let a = Point3D::new(1.0, 2.0, 3.0);
        let b = Point3D::new(0.5, -1.0, 2.0);

        assert_eq!(a + b, Point3D::new(1.5, 1.0, 5.0));
        assert_eq!(a - b, Point3D::new(0.5, 3.0, 1.0));
        assert_eq!(a * 2.0, Point3D::new(2.0, 4.0, 6.0));
        assert_relative_eq!(a.dot(&b), 0.5 - 2.0 + 6.0);
    }

    #[test]
    fn test_distance() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(3.0, 4.0, 12.0);
        assert_relative_eq!(a.distance(&b), 13.0);
        assert_relative_eq!(a.distance_squared(&b), 169.0);
    }

    #[test]
    fn test_lerp() {
        let a = Point3D::new(0.0, 0.0, 0.0);
        let b = Point3D::new(2.0, -2.0, 4.0);
        assert_eq!(a.lerp(&b, 0.5), Point3D::new(1.0, -1.0, 2.0));
    }

    #[test]
    fn test_bounds_from_points() {
        let points = [
            Point3D::new(-1.0, 0.0, 2.0),
            Point3D::new(1.0, 3.0, -2.0),
            Point3D::new(0.0, 1.0, 0.0),
        ];
        let bounds = Bounds3D::from_points(&points).unwrap();

        assert_eq!(bounds.min, Point3D::new(-1.0, 0.0, -2.0));
        assert_eq!(bounds.max, Point3D::new(1.0, 3.0, 2.0));
        assert_eq!(bounds.extent(), Point3D::new(2.0, 3.0, 4.0));
        assert_eq!(bounds.center(), Point3D::new(0.0, 1.5, 0.0));
        assert!(bounds.contains(&Point3D::new(1.0, 3.0, 2.0)));
        assert!(!bounds.contains(&Point3D::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn test_empty_bounds() {
        assert!(Bounds3D::from_points(&[]).is_none());
        let bounds = Bounds3D::empty();
        assert!(bounds.is_empty());
        assert_eq!(bounds.extent(), Point3D::origin());
    }
}
