//! Small linear-algebra helpers over point sets.
//!
//! Accumulation happens in `f64`; inputs and outputs stay `f32` except where
//! the caller needs the double-precision matrix (the superquadric fitter).

use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use super::point::Point3D;

/// Mean of a point set.
pub fn centroid(points: &[Point3D]) -> Option<Point3D> {
    if points.is_empty() {
        return None;
    }
    let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
    for p in points {
        sx += p.x as f64;
        sy += p.y as f64;
        sz += p.z as f64;
    }
    let n = points.len() as f64;
    Some(Point3D::new((sx / n) as f32, (sy / n) as f32, (sz / n) as f32))
}

/// Sample covariance about `center` (divides by n).
pub fn covariance(points: &[Point3D], center: &Point3D) -> Matrix3<f64> {
    let mut cov = Matrix3::<f64>::zeros();
    if points.is_empty() {
        return cov;
    }
    for p in points {
        let d = Vector3::new(
            (p.x - center.x) as f64,
            (p.y - center.y) as f64,
            (p.z - center.z) as f64,
        );
        cov += d * d.transpose();
    }
    cov / points.len() as f64
}

/// Principal axes of a point set.
#[derive(Debug, Clone)]
pub struct PrincipalAxes {
    /// Centroid of the points.
    pub center: Point3D,
    /// Unit axes, ordered by decreasing variance.
    pub axes: [Vector3<f64>; 3],
    /// Variances along each axis, decreasing.
    pub variances: [f64; 3],
}

/// Eigen-decomposition of the covariance, axes sorted by decreasing variance.
///
/// The third axis is flipped if needed so the axes form a right-handed frame.
pub fn principal_axes(points: &[Point3D]) -> Option<PrincipalAxes> {
    let center = centroid(points)?;
    let cov = covariance(points, &center);
    let eigen = SymmetricEigen::new(cov);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let axis = |i: usize| -> Vector3<f64> {
        let v: Vector3<f64> = eigen.eigenvectors.column(order[i]).into_owned();
        v.try_normalize(1e-12).unwrap_or_else(|| Vector3::ith(i, 1.0))
    };
    let a0 = axis(0);
    let a1 = axis(1);
    let mut a2 = axis(2);
    if a0.cross(&a1).dot(&a2) < 0.0 {
        a2 = -a2;
    }

    Some(PrincipalAxes {
        center,
        axes: [a0, a1, a2],
        variances: [
            eigen.eigenvalues[order[0]].max(0.0),
            eigen.eigenvalues[order[1]].max(0.0),
            eigen.eigenvalues[order[2]].max(0.0),
        ],
    })
}

/// Least-squares plane through a point set as `(unit normal, d)` with
/// `normal · p + d = 0`. Needs at least three non-collinear points.
pub fn fit_plane(points: &[Point3D]) -> Option<(Vector3<f32>, f32)> {
    if points.len() < 3 {
        return None;
    }
    let pa = principal_axes(points)?;
    // Degenerate if the second axis carries no spread (collinear set)
    if pa.variances[1] <= f64::EPSILON {
        return None;
    }
    let n = pa.axes[2];
    let normal = Vector3::new(n.x as f32, n.y as f32, n.z as f32);
    let d = -normal.dot(&pa.center.to_vector());
    Some((normal, d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_centroid() {
        let points = [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(2.0, 0.0, 0.0),
            Point3D::new(0.0, 2.0, 4.0),
            Point3D::new(2.0, 2.0, 0.0),
        ];
        let c = centroid(&points).unwrap();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        assert_relative_eq!(c.z, 1.0);
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_principal_axes_of_elongated_set() {
        // Points spread mostly along Y
        let points: Vec<Point3D> = (0..50)
            .map(|i| {
                let t = i as f32 * 0.1;
                Point3D::new(0.01 * (i % 3) as f32, t, 0.02 * (i % 2) as f32)
            })
            .collect();
        let pa = principal_axes(&points).unwrap();

        assert!(pa.axes[0].y.abs() > 0.99);
        assert!(pa.variances[0] > pa.variances[1]);
        assert!(pa.variances[1] >= pa.variances[2]);
        // Right-handed
        assert_relative_eq!(pa.axes[0].cross(&pa.axes[1]).dot(&pa.axes[2]), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fit_plane_horizontal() {
        let mut points = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                points.push(Point3D::new(i as f32 * 0.1, j as f32 * 0.1, 0.5));
            }
        }
        let (normal, d) = fit_plane(&points).unwrap();
        assert_relative_eq!(normal.z.abs(), 1.0, epsilon = 1e-5);
        // Plane z = 0.5
        assert_relative_eq!((d / normal.z).abs(), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_plane_degenerate() {
        let collinear: Vec<Point3D> = (0..5).map(|i| Point3D::new(i as f32, 0.0, 0.0)).collect();
        assert!(fit_plane(&collinear).is_none());
        assert!(fit_plane(&collinear[..2]).is_none());
    }
}
