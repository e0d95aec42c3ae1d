//! Dominant plane removal.
//!
//! RANSAC over random point triples, then a least-squares refit on the
//! consensus set. The support surface is removed only when it explains a
//! large enough share of the cloud; otherwise the cloud passes through
//! unchanged.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ensure_in_range, ensure_positive};
use crate::core::math::fit_plane;
use crate::core::{Point3D, PointCloud};

/// Configuration for plane extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneConfig {
    /// Inlier distance tolerance (meters).
    /// Default: 0.01 (1cm)
    pub distance_threshold: f32,

    /// RANSAC iterations.
    /// Default: 200
    pub max_iterations: usize,

    /// Minimum fraction of points the plane must explain to be removed.
    /// Default: 0.5
    pub min_inlier_ratio: f32,

    /// Random seed for reproducibility.
    /// 0 = use entropy-based seed (non-deterministic).
    /// Default: 0
    pub seed: u64,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.01,
            max_iterations: 200,
            min_inlier_ratio: 0.5,
            seed: 0,
        }
    }
}

impl PlaneConfig {
    /// Builder-style setter for the inlier tolerance.
    pub fn with_distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = threshold;
        self
    }

    /// Builder-style setter for the minimum inlier ratio.
    pub fn with_min_inlier_ratio(mut self, ratio: f32) -> Self {
        self.min_inlier_ratio = ratio;
        self
    }

    /// Builder-style setter for random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("plane.distance_threshold", self.distance_threshold)?;
        ensure_in_range("plane.min_inlier_ratio", self.min_inlier_ratio, 0.0, 1.0)?;
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "plane.max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Plane `normal · p + d = 0` with unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    /// Unit normal.
    pub normal: Vector3<f32>,
    /// Offset.
    pub d: f32,
}

impl PlaneModel {
    /// Plane through three points, `None` if they are (nearly) collinear.
    pub fn from_points(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<Self> {
        let ab = (*b - *a).to_vector();
        let ac = (*c - *a).to_vector();
        let normal = ab.cross(&ac).try_normalize(1e-9)?;
        Some(Self {
            normal,
            d: -normal.dot(&a.to_vector()),
        })
    }

    /// Unsigned point-to-plane distance.
    #[inline]
    pub fn distance(&self, p: &Point3D) -> f32 {
        (self.normal.dot(&p.to_vector()) + self.d).abs()
    }

    /// Normal flipped, if needed, to point along `up`.
    pub fn oriented_towards(&self, up: &Vector3<f32>) -> Self {
        if self.normal.dot(up) < 0.0 {
            Self {
                normal: -self.normal,
                d: -self.d,
            }
        } else {
            *self
        }
    }
}

/// Result of one extraction.
#[derive(Debug, Clone)]
pub struct PlaneExtraction {
    /// Points that are not plane inliers (the input when no plane was removed).
    pub remaining: PointCloud,
    /// The removed plane, if any.
    pub plane: Option<PlaneModel>,
    /// Number of points removed.
    pub inliers: usize,
}

/// RANSAC plane extractor.
#[derive(Debug, Clone)]
pub struct PlaneExtractor {
    config: PlaneConfig,
}

impl PlaneExtractor {
    /// Create an extractor.
    pub fn new(config: PlaneConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PlaneConfig {
        &self.config
    }

    fn rng(&self) -> StdRng {
        if self.config.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(self.config.seed)
        }
    }

    fn inlier_mask(&self, plane: &PlaneModel, points: &[Point3D], mask: &mut [bool]) -> usize {
        let mut count = 0;
        for (m, p) in mask.iter_mut().zip(points) {
            *m = plane.distance(p) <= self.config.distance_threshold;
            count += *m as usize;
        }
        count
    }

    /// Remove the dominant plane from `cloud`.
    pub fn extract(&self, cloud: &PointCloud) -> PlaneExtraction {
        let points = cloud.points();
        let n = points.len();
        let unchanged = || PlaneExtraction {
            remaining: cloud.clone(),
            plane: None,
            inliers: 0,
        };
        if n < 3 {
            return unchanged();
        }

        let mut rng = self.rng();
        let mut best: Option<PlaneModel> = None;
        let mut best_count = 0usize;
        let mut mask = vec![false; n];

        for _ in 0..self.config.max_iterations {
            let i = rng.random_range(0..n);
            let mut j = rng.random_range(0..n);
            while j == i {
                j = rng.random_range(0..n);
            }
            let mut k = rng.random_range(0..n);
            while k == i || k == j {
                k = rng.random_range(0..n);
            }

            let Some(candidate) = PlaneModel::from_points(&points[i], &points[j], &points[k])
            else {
                continue;
            };
            let count = self.inlier_mask(&candidate, points, &mut mask);
            if count > best_count {
                best_count = count;
                best = Some(candidate);
            }
        }

        let Some(mut plane) = best else {
            return unchanged();
        };

        // Least-squares refit on the consensus set
        self.inlier_mask(&plane, points, &mut mask);
        let consensus: Vec<Point3D> = points
            .iter()
            .zip(&mask)
            .filter(|&(_, &m)| m)
            .map(|(p, _)| *p)
            .collect();
        if let Some((normal, d)) = fit_plane(&consensus) {
            let refined = PlaneModel { normal, d };
            let mut refined_mask = vec![false; n];
            let refined_count = self.inlier_mask(&refined, points, &mut refined_mask);
            if refined_count >= best_count {
                plane = refined;
                best_count = refined_count;
                mask = refined_mask;
            }
        }

        let ratio = best_count as f32 / n as f32;
        if ratio < self.config.min_inlier_ratio {
            log::debug!(
                "No dominant plane: best explains {:.1}% of {} points",
                ratio * 100.0,
                n
            );
            return unchanged();
        }

        let remaining = cloud.derive(
            points
                .iter()
                .zip(&mask)
                .filter(|&(_, &m)| !m)
                .map(|(p, _)| *p)
                .collect(),
        );
        PlaneExtraction {
            remaining,
            plane: Some(plane),
            inliers: best_count,
        }
    }
}

impl Default for PlaneExtractor {
    fn default() -> Self {
        Self::new(PlaneConfig::default())
    }
}
