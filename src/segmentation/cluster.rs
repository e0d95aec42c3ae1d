//! Euclidean cluster extraction.
//!
//! Connected components under a distance threshold, using an R-tree for the
//! radius queries. Clusters outside `[min_points, max_points]` are dropped.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

use super::candidate::ObjectCandidate;
use crate::config::{ConfigError, ensure_positive};
use crate::core::{Point3D, PointCloud};

/// Configuration for Euclidean clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Points within this distance are connected (meters).
    /// Must exceed the voxel leaf size.
    /// Default: 0.02
    pub tolerance: f32,

    /// Smaller clusters are noise.
    /// Default: 30
    pub min_points: usize,

    /// Larger clusters are residual background.
    /// Default: 25000
    pub max_points: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            min_points: 30,
            max_points: 25_000,
        }
    }
}

impl ClusterConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("cluster.tolerance", self.tolerance)?;
        if self.min_points == 0 {
            return Err(ConfigError::invalid("cluster.min_points", "must be at least 1"));
        }
        if self.max_points < self.min_points {
            return Err(ConfigError::invalid(
                "cluster.max_points",
                format!(
                    "must be >= min_points ({} < {})",
                    self.max_points, self.min_points
                ),
            ));
        }
        Ok(())
    }
}

/// A cloud point with its index, for R-tree storage.
#[derive(Clone, Copy, Debug)]
struct IndexedPoint {
    position: [f32; 3],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }

    fn contains_point(&self, point: &[f32; 3]) -> bool {
        self.position == *point
    }
}

/// Counts through the clustering stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Connected components found.
    pub components: usize,
    /// Components below `min_points`.
    pub too_small: usize,
    /// Components above `max_points`.
    pub too_large: usize,
}

/// Euclidean cluster segmenter.
#[derive(Debug, Clone)]
pub struct EuclideanClusterer {
    config: ClusterConfig,
}

impl EuclideanClusterer {
    /// Create a segmenter.
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Connected components as index lists, ordered by their first point.
    pub fn components(&self, points: &[Point3D]) -> Vec<Vec<usize>> {
        if points.is_empty() {
            return Vec::new();
        }

        let tree = RTree::bulk_load(
            points
                .iter()
                .enumerate()
                .map(|(index, p)| IndexedPoint {
                    position: p.to_array(),
                    index,
                })
                .collect(),
        );
        let radius_2 = self.config.tolerance * self.config.tolerance;

        let mut visited = vec![false; points.len()];
        let mut components = Vec::new();
        let mut frontier = Vec::new();

        for seed in 0..points.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            frontier.push(seed);
            let mut members = Vec::new();

            while let Some(i) = frontier.pop() {
                members.push(i);
                for neighbor in tree.locate_within_distance(points[i].to_array(), radius_2) {
                    if !visited[neighbor.index] {
                        visited[neighbor.index] = true;
                        frontier.push(neighbor.index);
                    }
                }
            }

            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Partition `cloud` into object candidates.
    pub fn segment(&self, cloud: &PointCloud) -> (Vec<ObjectCandidate>, ClusterStats) {
        let mut stats = ClusterStats::default();
        let mut candidates = Vec::new();

        for members in self.components(cloud.points()) {
            stats.components += 1;
            if members.len() < self.config.min_points {
                stats.too_small += 1;
                continue;
            }
            if members.len() > self.config.max_points {
                stats.too_large += 1;
                continue;
            }
            if let Some(candidate) = ObjectCandidate::new(candidates.len(), cloud.select(&members))
            {
                candidates.push(candidate);
            }
        }

        log::trace!(
            "Clustering: {} components, {} kept, {} too small, {} too large",
            stats.components,
            candidates.len(),
            stats.too_small,
            stats.too_large
        );
        (candidates, stats)
    }
}

impl Default for EuclideanClusterer {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}
