//! Segmentation: support-plane removal and object clustering.
//!
//! ```text
//! filtered cloud → PlaneExtractor → remaining points → EuclideanClusterer → [ObjectCandidate]
//! ```

mod candidate;
mod cluster;
mod plane;

pub use candidate::ObjectCandidate;
pub use cluster::{ClusterConfig, ClusterStats, EuclideanClusterer};
pub use plane::{PlaneConfig, PlaneExtraction, PlaneExtractor, PlaneModel};
