//! Superquadric fitting.
//!
//! Two phases:
//!
//! 1. **Hypotheses**: candidate frames (principal axes, plus yaw steps about
//!    the reference z axis for upright objects), each in its three cyclic
//!    axis orders so any axis can become the model's z. Each frame is
//!    centered on the local bounding box, scales start at the half-extents and
//!    the exponents are chosen from a coarse grid.
//! 2. **Refinement**: Levenberg–Marquardt over center, a rotation increment,
//!    scales and exponents, minimizing squared radial distance. A step is
//!    accepted only if the cost decreases.
//!
//! All arithmetic is `f64`; the result is reported in `f32`.

use nalgebra::{Matrix3, Rotation3, SMatrix, SVector, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::superquadric::{SuperquadricFit, radial_distance};
use crate::config::{ConfigError, ensure_positive};
use crate::core::Point3D;
use crate::core::math::principal_axes;
use crate::segmentation::ObjectCandidate;

/// Parameter count: translation (3), rotation increment (3), scales (3), exponents (2).
const NP: usize = 11;
type Params = SVector<f64, NP>;
type Normal = SMatrix<f64, NP, NP>;

/// Coarse exponent grid for initialization.
const EXPONENT_GRID: [f64; 7] = [0.8, 1.0, 1.5, 2.5, 4.0, 6.0, 10.0];

/// Smallest admissible lower exponent bound.
///
/// At 0.5 the cross-section is a diamond, which is a square turned by 45°, so
/// a square prism gets a second exact fit that no table row accepts.
pub const MIN_EXPONENT_FLOOR: f32 = 0.8;

/// Smallest admissible semi-axis (meters).
const MIN_SCALE: f64 = 1e-4;

/// Configuration for superquadric fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitterConfig {
    /// Candidates are subsampled to at most this many points.
    /// Default: 300
    pub max_points: usize,

    /// Candidates with fewer points are not fitted.
    /// Default: 10
    pub min_points: usize,

    /// Levenberg–Marquardt iterations per hypothesis.
    /// Default: 40
    pub max_iterations: usize,

    /// Yaw step for upright-frame hypotheses (degrees).
    /// Default: 7.5
    pub yaw_step_deg: f32,

    /// Number of best hypotheses refined.
    /// Default: 3
    pub hypotheses: usize,

    /// Lower exponent bound. At least [`MIN_EXPONENT_FLOOR`].
    /// Default: 0.8
    pub min_exponent: f32,

    /// Upper exponent bound.
    /// Default: 10.0
    pub max_exponent: f32,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            max_points: 300,
            min_points: 10,
            max_iterations: 40,
            yaw_step_deg: 7.5,
            hypotheses: 3,
            min_exponent: MIN_EXPONENT_FLOOR,
            max_exponent: 10.0,
        }
    }
}

impl FitterConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("fitting.yaw_step_deg", self.yaw_step_deg)?;
        ensure_positive("fitting.min_exponent", self.min_exponent)?;
        ensure_positive("fitting.max_exponent", self.max_exponent)?;
        if self.min_exponent < MIN_EXPONENT_FLOOR {
            return Err(ConfigError::invalid(
                "fitting.min_exponent",
                format!(
                    "must be at least {} (got {})",
                    MIN_EXPONENT_FLOOR, self.min_exponent
                ),
            ));
        }
        if self.min_exponent > self.max_exponent {
            return Err(ConfigError::invalid(
                "fitting.min_exponent",
                format!(
                    "must not exceed max_exponent ({} > {})",
                    self.min_exponent, self.max_exponent
                ),
            ));
        }
        if self.min_points < 4 {
            return Err(ConfigError::invalid("fitting.min_points", "must be at least 4"));
        }
        if self.max_points < self.min_points {
            return Err(ConfigError::invalid(
                "fitting.max_points",
                "must be >= fitting.min_points",
            ));
        }
        if self.hypotheses == 0 {
            return Err(ConfigError::invalid("fitting.hypotheses", "must be at least 1"));
        }
        Ok(())
    }
}

/// One initial guess.
#[derive(Debug, Clone)]
struct Hypothesis {
    rotation: Matrix3<f64>,
    center: Vector3<f64>,
    scale: [f64; 3],
    e1: f64,
    e2: f64,
    cost: f64,
}

/// Residual model for one candidate around a fixed base rotation.
struct Problem<'a> {
    points: &'a [Vector3<f64>],
    base: Matrix3<f64>,
    min_exponent: f64,
    max_exponent: f64,
}

impl Problem<'_> {
    fn rotation(&self, x: &Params) -> Matrix3<f64> {
        self.base * Rotation3::new(Vector3::new(x[3], x[4], x[5])).into_inner()
    }

    fn residuals(&self, x: &Params, out: &mut Vec<f64>) {
        let rt = self.rotation(x).transpose();
        let t = Vector3::new(x[0], x[1], x[2]);
        let scale = [x[6], x[7], x[8]];
        out.clear();
        out.extend(
            self.points
                .iter()
                .map(|p| radial_distance(&(rt * (p - t)), &scale, x[9], x[10])),
        );
    }

    fn cost(&self, x: &Params, buf: &mut Vec<f64>) -> f64 {
        self.residuals(x, buf);
        let cost: f64 = buf.iter().map(|r| r * r).sum();
        if cost.is_finite() { cost } else { f64::INFINITY }
    }

    fn clamp(&self, x: &mut Params) {
        for i in 6..9 {
            x[i] = x[i].max(MIN_SCALE);
        }
        x[9] = x[9].clamp(self.min_exponent, self.max_exponent);
        x[10] = x[10].clamp(self.min_exponent, self.max_exponent);
    }
}

/// Fits superquadrics to object candidates.
#[derive(Debug, Clone)]
pub struct SuperquadricFitter {
    config: FitterConfig,
}

impl SuperquadricFitter {
    /// Create a fitter.
    pub fn new(config: FitterConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &FitterConfig {
        &self.config
    }

    /// Fit a superquadric to `candidate`, in the candidate's frame.
    ///
    /// Returns `None` when the candidate has too few points to constrain a fit.
    pub fn fit(&self, candidate: &ObjectCandidate) -> Option<SuperquadricFit> {
        let all = candidate.points();
        if all.len() < self.config.min_points {
            return None;
        }

        let stride = all.len().div_ceil(self.config.max_points.max(1));
        let sampled: Vec<Point3D> = all.iter().step_by(stride.max(1)).copied().collect();
        let points: Vec<Vector3<f64>> = sampled
            .iter()
            .map(|p| Vector3::new(p.x as f64, p.y as f64, p.z as f64))
            .collect();

        let mut hypotheses = self.hypotheses(&sampled, &points);
        hypotheses.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        hypotheses.truncate(self.config.hypotheses);

        let mut best: Option<(Matrix3<f64>, Params, f64)> = None;
        for h in &hypotheses {
            let problem = Problem {
                points: &points,
                base: h.rotation,
                min_exponent: self.config.min_exponent as f64,
                max_exponent: self.config.max_exponent as f64,
            };
            let x0 = Params::from_column_slice(&[
                h.center.x, h.center.y, h.center.z, 0.0, 0.0, 0.0, h.scale[0], h.scale[1],
                h.scale[2], h.e1, h.e2,
            ]);
            let (x, cost) = self.refine(&problem, x0);
            if best.as_ref().is_none_or(|(_, _, c)| cost < *c) {
                best = Some((problem.rotation(&x), x, cost));
            }
        }

        let (rotation, x, cost) = best?;
        let n = points.len() as f64;
        let mean_scale = (x[6] + x[7] + x[8]) / 3.0;
        let residual = (cost / n).sqrt() / mean_scale;

        let rotation = Rotation3::from_matrix(&rotation.map(|v| v as f32));
        Some(SuperquadricFit {
            frame: candidate.frame().clone(),
            position: Point3D::new(x[0] as f32, x[1] as f32, x[2] as f32),
            orientation: UnitQuaternion::from_rotation_matrix(&rotation),
            scale: [x[6] as f32, x[7] as f32, x[8] as f32],
            e1: x[9] as f32,
            e2: x[10] as f32,
            residual: residual as f32,
            support: points.len(),
        })
    }

    /// Candidate frames as rotation matrices whose columns are the local axes.
    fn frames(&self, sampled: &[Point3D]) -> Vec<Matrix3<f64>> {
        let mut bases = Vec::new();
        if let Some(pa) = principal_axes(sampled) {
            bases.push(Matrix3::from_columns(&pa.axes));
        }
        let step = (self.config.yaw_step_deg as f64).to_radians();
        let steps = (std::f64::consts::FRAC_PI_2 / step).ceil().max(1.0) as usize;
        for k in 0..steps {
            let yaw = k as f64 * step;
            bases.push(Rotation3::from_axis_angle(&Vector3::z_axis(), yaw).into_inner());
        }

        let mut frames = Vec::with_capacity(bases.len() * 3);
        for b in bases {
            let c0 = b.column(0).into_owned();
            let c1 = b.column(1).into_owned();
            let c2 = b.column(2).into_owned();
            frames.push(b);
            frames.push(Matrix3::from_columns(&[c1, c2, c0]));
            frames.push(Matrix3::from_columns(&[c2, c0, c1]));
        }
        frames
    }

    /// Best grid initialization per frame.
    fn hypotheses(&self, sampled: &[Point3D], points: &[Vector3<f64>]) -> Vec<Hypothesis> {
        let min_e = self.config.min_exponent as f64;
        let max_e = self.config.max_exponent as f64;
        let mut grid: Vec<f64> = EXPONENT_GRID
            .iter()
            .copied()
            .filter(|e| *e >= min_e && *e <= max_e)
            .collect();
        if grid.is_empty() {
            grid.push(min_e);
        }

        let mut local = Vec::with_capacity(points.len());
        let mut out = Vec::new();

        for rotation in self.frames(sampled) {
            let rt = rotation.transpose();
            local.clear();
            local.extend(points.iter().map(|p| rt * p));

            let mut min = Vector3::repeat(f64::INFINITY);
            let mut max = Vector3::repeat(f64::NEG_INFINITY);
            for q in &local {
                min = min.inf(q);
                max = max.sup(q);
            }
            let center_local = (min + max) * 0.5;
            let half = (max - min) * 0.5;
            let scale = [
                half.x.max(MIN_SCALE),
                half.y.max(MIN_SCALE),
                half.z.max(MIN_SCALE),
            ];
            for q in local.iter_mut() {
                *q -= center_local;
            }

            let mut best: Option<(f64, f64, f64)> = None;
            for &e1 in &grid {
                for &e2 in &grid {
                    let cost: f64 = local
                        .iter()
                        .map(|q| {
                            let d = radial_distance(q, &scale, e1, e2);
                            d * d
                        })
                        .sum();
                    if cost.is_finite() && best.is_none_or(|(c, _, _)| cost < c) {
                        best = Some((cost, e1, e2));
                    }
                }
            }

            if let Some((cost, e1, e2)) = best {
                out.push(Hypothesis {
                    rotation,
                    center: rotation * center_local,
                    scale,
                    e1,
                    e2,
                    cost,
                });
            }
        }
        out
    }

    /// Levenberg–Marquardt refinement with a forward-difference Jacobian.
    fn refine(&self, problem: &Problem<'_>, mut x: Params) -> (Params, f64) {
        let n = problem.points.len();
        let mut r0 = Vec::with_capacity(n);
        let mut rj = Vec::with_capacity(n);
        let mut jacobian = vec![Params::zeros(); n];

        problem.clamp(&mut x);
        let mut cost = problem.cost(&x, &mut r0);
        let mut lambda = 1e-3;

        for _ in 0..self.config.max_iterations {
            problem.residuals(&x, &mut r0);
            for j in 0..NP {
                let h = 1e-6 * (1.0 + x[j].abs());
                let mut xp = x;
                xp[j] += h;
                problem.residuals(&xp, &mut rj);
                for (row, (a, b)) in jacobian.iter_mut().zip(r0.iter().zip(&rj)) {
                    row[j] = (b - a) / h;
                }
            }

            let mut jtj = Normal::zeros();
            let mut jtr = Params::zeros();
            for (row, r) in jacobian.iter().zip(&r0) {
                jtj += *row * row.transpose();
                jtr += *row * *r;
            }

            let mut accepted = false;
            for _ in 0..10 {
                let mut a = jtj;
                for k in 0..NP {
                    a[(k, k)] += lambda * jtj[(k, k)].max(1e-6);
                }
                let Some(chol) = a.cholesky() else {
                    lambda *= 10.0;
                    continue;
                };
                let mut candidate = x + chol.solve(&(-jtr));
                problem.clamp(&mut candidate);
                let candidate_cost = problem.cost(&candidate, &mut rj);
                if candidate_cost < cost {
                    let gain = cost - candidate_cost;
                    x = candidate;
                    cost = candidate_cost;
                    lambda = (lambda * 0.1).max(1e-12);
                    accepted = gain > 1e-12 * cost.max(f64::MIN_POSITIVE);
                    break;
                }
                lambda *= 10.0;
            }
            if !accepted {
                break;
            }
        }
        (x, cost)
    }
}

impl Default for SuperquadricFitter {
    fn default() -> Self {
        Self::new(FitterConfig::default())
    }
}
