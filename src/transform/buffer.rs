//! Frame graph of the latest known transforms.
//!
//! Edges are stored as `parent_T_child` (maps child-frame points into the
//! parent frame). Lookups walk the graph in either direction and compose
//! along the shortest hop path.

use std::collections::{HashMap, HashSet, VecDeque};

use nalgebra::Isometry3;
use parking_lot::RwLock;

use super::error::TransformError;
use super::snapshot::TransformSnapshot;
use crate::core::FrameId;

/// Anything that can answer "how do I get from frame A to frame B".
///
/// Implementations must not block waiting for data: they return the best
/// snapshot currently known or fail immediately.
pub trait TransformSource: Send + Sync {
    /// Transform mapping points in `source` into `target`.
    fn lookup(&self, source: &FrameId, target: &FrameId)
    -> Result<TransformSnapshot, TransformError>;
}

#[derive(Debug, Clone)]
struct Edge {
    parent_t_child: Isometry3<f32>,
    stamp_us: u64,
    is_static: bool,
}

/// Thread-safe store of the latest transform per frame pair.
#[derive(Debug, Default)]
pub struct TransformBuffer {
    edges: RwLock<HashMap<(FrameId, FrameId), Edge>>,
}

impl TransformBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest `parent_T_child` transform.
    pub fn set_transform(
        &self,
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        parent_t_child: Isometry3<f32>,
        stamp_us: u64,
    ) {
        self.insert(parent.into(), child.into(), parent_t_child, stamp_us, false);
    }

    /// Record a transform that never changes (mount offsets).
    pub fn set_static_transform(
        &self,
        parent: impl Into<FrameId>,
        child: impl Into<FrameId>,
        parent_t_child: Isometry3<f32>,
    ) {
        self.insert(parent.into(), child.into(), parent_t_child, 0, true);
    }

    fn insert(
        &self,
        parent: FrameId,
        child: FrameId,
        parent_t_child: Isometry3<f32>,
        stamp_us: u64,
        is_static: bool,
    ) {
        let mut edges = self.edges.write();
        // One edge per frame pair regardless of direction
        edges.remove(&(child.clone(), parent.clone()));
        edges.insert(
            (parent, child),
            Edge {
                parent_t_child,
                stamp_us,
                is_static,
            },
        );
    }

    /// Forget all transforms.
    pub fn clear(&self) {
        self.edges.write().clear();
    }

    /// Number of stored edges.
    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }
}

/// Accumulated state while walking the frame graph.
#[derive(Clone)]
struct Walk {
    frame_t_source: Isometry3<f32>,
    oldest_stamp_us: Option<u64>,
}

impl TransformSource for TransformBuffer {
    fn lookup(
        &self,
        source: &FrameId,
        target: &FrameId,
    ) -> Result<TransformSnapshot, TransformError> {
        if source == target {
            return Ok(TransformSnapshot::identity(source));
        }

        let edges = self.edges.read();

        // Adjacency: frame -> [(neighbor, neighbor_T_frame, edge)]
        let mut adjacency: HashMap<&FrameId, Vec<(&FrameId, Isometry3<f32>, &Edge)>> =
            HashMap::new();
        for ((parent, child), edge) in edges.iter() {
            adjacency
                .entry(child)
                .or_default()
                .push((parent, edge.parent_t_child, edge));
            adjacency
                .entry(parent)
                .or_default()
                .push((child, edge.parent_t_child.inverse(), edge));
        }

        let mut visited: HashSet<&FrameId> = HashSet::new();
        let mut queue: VecDeque<(&FrameId, Walk)> = VecDeque::new();
        visited.insert(source);
        queue.push_back((
            source,
            Walk {
                frame_t_source: Isometry3::identity(),
                oldest_stamp_us: None,
            },
        ));

        while let Some((frame, walk)) = queue.pop_front() {
            if frame == target {
                return Ok(TransformSnapshot::new(
                    source.clone(),
                    target.clone(),
                    walk.frame_t_source,
                    walk.oldest_stamp_us.unwrap_or(0),
                    walk.oldest_stamp_us.is_none(),
                ));
            }
            let Some(neighbors) = adjacency.get(frame) else {
                continue;
            };
            for (next, next_t_frame, edge) in neighbors {
                if !visited.insert(*next) {
                    continue;
                }
                let oldest_stamp_us = if edge.is_static {
                    walk.oldest_stamp_us
                } else {
                    Some(
                        walk.oldest_stamp_us
                            .map_or(edge.stamp_us, |s| s.min(edge.stamp_us)),
                    )
                };
                queue.push_back((
                    *next,
                    Walk {
                        frame_t_source: next_t_frame * walk.frame_t_source,
                        oldest_stamp_us,
                    },
                ));
            }
        }

        Err(TransformError::Unavailable {
            source_frame: source.clone(),
            target_frame: target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point3D;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn translation(x: f32, y: f32, z: f32) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
    }

    fn frame(name: &str) -> FrameId {
        FrameId::new(name)
    }

    #[test]
    fn test_same_frame_is_identity() {
        let buffer = TransformBuffer::new();
        let snap = buffer.lookup(&frame("a"), &frame("a")).unwrap();
        assert!(snap.is_static());
        assert_eq!(snap.transform(), &Isometry3::identity());
    }

    #[test]
    fn test_direct_and_inverse_lookup() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("base_link", "camera", translation(0.1, 0.0, 0.5), 100);

        let fwd = buffer.lookup(&frame("camera"), &frame("base_link")).unwrap();
        let p = fwd.apply_point(&Point3D::origin());
        assert_relative_eq!(p.x, 0.1);
        assert_relative_eq!(p.z, 0.5);
        assert_eq!(fwd.stamp_us(), 100);
        assert!(!fwd.is_static());

        let inv = buffer.lookup(&frame("base_link"), &frame("camera")).unwrap();
        let q = inv.apply_point(&Point3D::origin());
        assert_relative_eq!(q.x, -0.1);
        assert_relative_eq!(q.z, -0.5);
    }

    #[test]
    fn test_multi_hop_composition() {
        let buffer = TransformBuffer::new();
        // map <- base_link (dynamic), base_link <- camera_mount (static), mount <- optical (rotation)
        buffer.set_transform("map", "base_link", translation(1.0, 0.0, 0.0), 500);
        buffer.set_static_transform("base_link", "camera_mount", translation(0.0, 0.0, 0.4));
        buffer.set_transform(
            "camera_mount",
            "camera_optical",
            Isometry3::new(Vector3::zeros(), Vector3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2)),
            200,
        );

        let snap = buffer
            .lookup(&frame("camera_optical"), &frame("map"))
            .unwrap();

        // x axis of optical maps to y axis of map
        let p = snap.apply_point(&Point3D::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.4, epsilon = 1e-5);
        // Oldest dynamic edge
        assert_eq!(snap.stamp_us(), 200);
        assert!(!snap.is_static());
    }

    #[test]
    fn test_static_chain_is_static() {
        let buffer = TransformBuffer::new();
        buffer.set_static_transform("base_link", "camera", translation(0.0, 0.0, 0.5));
        let snap = buffer.lookup(&frame("camera"), &frame("base_link")).unwrap();
        assert!(snap.is_static());
    }

    #[test]
    fn test_unavailable() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("base_link", "camera", translation(0.0, 0.0, 0.5), 0);
        buffer.set_transform("odom", "wheel", translation(0.0, 0.0, 0.0), 0);

        let err = buffer.lookup(&frame("camera"), &frame("odom")).unwrap_err();
        assert!(matches!(err, TransformError::Unavailable { .. }));
    }

    #[test]
    fn test_update_replaces_reverse_edge() {
        let buffer = TransformBuffer::new();
        buffer.set_transform("a", "b", translation(1.0, 0.0, 0.0), 10);
        buffer.set_transform("b", "a", translation(2.0, 0.0, 0.0), 20);

        assert_eq!(buffer.len(), 1);
        let snap = buffer.lookup(&frame("a"), &frame("b")).unwrap();
        assert_relative_eq!(snap.apply_point(&Point3D::origin()).x, 2.0);
        assert_eq!(snap.stamp_us(), 20);
    }
}
