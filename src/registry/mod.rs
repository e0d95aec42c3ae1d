//! Object registry.
//!
//! Accumulates recognized objects across pipeline runs, one map per shape
//! label, deduplicated by spatial proximity. Shared between the pipeline
//! (writer) and the query interface (readers) behind a `RwLock`; a batch of
//! detections from one run is applied under a single write lock so readers
//! never see a half-applied cycle.
//!
//! # Merge policy
//!
//! A detection within `merge_radius` of an existing entry of the same label
//! updates that entry instead of creating a new one:
//!
//! - position: exponential smoothing `p ← (1 − α)·p + α·p_new`
//!   (`Overwrite` is `α = 1`)
//! - orientation, extent, exponents, residual: taken from the new detection,
//!   since box axes of successive fits are not guaranteed to correspond
//!
//! After a merge moves an entry, any other same-label entries now within the
//! radius are coalesced into it, so no two entries of one label are ever
//! closer than `merge_radius`.

mod object;

pub use object::{ObjectId, RecognizedObject};

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classification::ShapeLabel;
use crate::config::{ConfigError, ensure_in_range, ensure_positive};
use crate::core::{FrameId, Point3D};

/// How a repeated detection updates an entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Replace with the newest detection.
    Overwrite,
    /// Blend positions with weight `alpha` on the new detection.
    ExponentialSmoothing {
        /// Weight of the new detection in (0, 1].
        alpha: f32,
    },
}

impl MergeStrategy {
    /// Weight of the new detection.
    pub fn alpha(&self) -> f32 {
        match self {
            MergeStrategy::Overwrite => 1.0,
            MergeStrategy::ExponentialSmoothing { alpha } => *alpha,
        }
    }
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::ExponentialSmoothing { alpha: 0.5 }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Same-label detections closer than this are one object (meters).
    /// Default: 0.05
    pub merge_radius: f32,
    /// Update rule for repeated detections.
    pub merge: MergeStrategy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            merge_radius: 0.05,
            merge: MergeStrategy::default(),
        }
    }
}

impl RegistryConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("registry.merge_radius", self.merge_radius)?;
        if let MergeStrategy::ExponentialSmoothing { alpha } = self.merge {
            ensure_in_range("registry.merge.alpha", alpha, f32::MIN_POSITIVE, 1.0)?;
        }
        Ok(())
    }
}

/// Registry write failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Object is not expressed in the registry's frame.
    #[error("object in frame `{actual}`, registry holds `{expected}`")]
    FrameMismatch {
        /// Registry frame.
        expected: FrameId,
        /// Object frame.
        actual: FrameId,
    },
    /// Writes were refused because the module is disabled.
    #[error("registry is not accepting writes")]
    Inactive,
}

/// Result of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New entry created.
    Inserted(ObjectId),
    /// Existing entry updated; `absorbed` other entries were coalesced into it.
    Merged {
        /// Updated entry.
        id: ObjectId,
        /// Entries removed by coalescing.
        absorbed: usize,
    },
}

#[derive(Debug, Default)]
struct RegistryState {
    maps: [BTreeMap<ObjectId, RecognizedObject>; 3],
    next_id: u64,
}

impl RegistryState {
    fn nearest_within(
        &self,
        label: ShapeLabel,
        position: &Point3D,
        radius: f32,
        exclude: Option<ObjectId>,
    ) -> Option<ObjectId> {
        self.maps[label.index()]
            .values()
            .filter(|o| Some(o.id) != exclude)
            .map(|o| (o.id, o.position.distance(position)))
            .filter(|(_, d)| *d < radius)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id)
    }
}

/// Deduplicating store of recognized objects.
#[derive(Debug)]
pub struct ObjectRegistry {
    config: RegistryConfig,
    frame: FrameId,
    state: RwLock<RegistryState>,
}

impl ObjectRegistry {
    /// Create an empty registry holding objects in `frame`.
    pub fn new(config: RegistryConfig, frame: impl Into<FrameId>) -> Self {
        Self {
            config,
            frame: frame.into(),
            state: RwLock::new(RegistryState {
                maps: Default::default(),
                next_id: 1,
            }),
        }
    }

    /// Frame all entries are expressed in.
    pub fn frame(&self) -> &FrameId {
        &self.frame
    }

    /// Configuration in use.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Insert a detection, or merge it into a nearby entry of the same label.
    pub fn upsert(&self, object: RecognizedObject) -> Result<UpsertOutcome, RegistryError> {
        self.check_frame(&object)?;
        let mut state = self.state.write();
        Ok(self.upsert_locked(&mut state, object))
    }

    /// Apply a whole batch under one write lock.
    ///
    /// `accepting` is evaluated while the lock is held; if it returns false
    /// nothing is written. This lets a caller's enabled flag and
    /// [`clear`](Self::clear) serialize with the batch.
    pub fn upsert_batch<F>(
        &self,
        objects: Vec<RecognizedObject>,
        accepting: F,
    ) -> Result<Vec<UpsertOutcome>, RegistryError>
    where
        F: FnOnce() -> bool,
    {
        for object in &objects {
            self.check_frame(object)?;
        }
        let mut state = self.state.write();
        if !accepting() {
            return Err(RegistryError::Inactive);
        }
        Ok(objects
            .into_iter()
            .map(|object| self.upsert_locked(&mut state, object))
            .collect())
    }

    fn check_frame(&self, object: &RecognizedObject) -> Result<(), RegistryError> {
        if object.frame == self.frame {
            Ok(())
        } else {
            Err(RegistryError::FrameMismatch {
                expected: self.frame.clone(),
                actual: object.frame.clone(),
            })
        }
    }

    fn upsert_locked(&self, state: &mut RegistryState, object: RecognizedObject) -> UpsertOutcome {
        let radius = self.config.merge_radius;
        let label = object.label;

        let Some(id) = state.nearest_within(label, &object.position, radius, None) else {
            let id = ObjectId(state.next_id);
            state.next_id += 1;
            log::info!(
                "New {} {} at ({:.3}, {:.3}, {:.3})",
                label,
                id,
                object.position.x,
                object.position.y,
                object.position.z
            );
            state.maps[label.index()].insert(id, RecognizedObject { id, ..object });
            return UpsertOutcome::Inserted(id);
        };

        let alpha = self.config.merge.alpha();
        let map = &mut state.maps[label.index()];
        if let Some(entry) = map.get_mut(&id) {
            entry.position = entry.position.lerp(&object.position, alpha);
            entry.orientation = object.orientation;
            entry.extent = object.extent;
            entry.exponents = object.exponents;
            entry.residual = object.residual;
            entry.observations = entry.observations.saturating_add(1);
            entry.last_seen_us = entry.last_seen_us.max(object.last_seen_us);
        }

        let absorbed = Self::coalesce(state, label, id, radius);
        UpsertOutcome::Merged { id, absorbed }
    }

    /// Fold same-label neighbours of `id` into it until none are within `radius`.
    fn coalesce(state: &mut RegistryState, label: ShapeLabel, id: ObjectId, radius: f32) -> usize {
        let mut absorbed = 0;
        loop {
            let Some(position) = state.maps[label.index()].get(&id).map(|o| o.position) else {
                return absorbed;
            };
            let Some(other_id) = state.nearest_within(label, &position, radius, Some(id)) else {
                return absorbed;
            };
            let map = &mut state.maps[label.index()];
            let Some(other) = map.remove(&other_id) else {
                return absorbed;
            };
            if let Some(entry) = map.get_mut(&id) {
                let total = entry.observations as f32 + other.observations as f32;
                let w = other.observations as f32 / total.max(1.0);
                entry.position = entry.position.lerp(&other.position, w);
                entry.observations = entry.observations.saturating_add(other.observations);
                entry.first_seen_us = entry.first_seen_us.min(other.first_seen_us);
                entry.last_seen_us = entry.last_seen_us.max(other.last_seen_us);
            }
            log::debug!("Coalesced {} {} into {}", label, other_id, id);
            absorbed += 1;
        }
    }

    /// All objects, or those of one label, ordered by label then id.
    pub fn query(&self, label: Option<ShapeLabel>) -> Vec<RecognizedObject> {
        let state = self.state.read();
        match label {
            Some(label) => state.maps[label.index()].values().cloned().collect(),
            None => state
                .maps
                .iter()
                .flat_map(|m| m.values().cloned())
                .collect(),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut state = self.state.write();
        for map in state.maps.iter_mut() {
            map.clear();
        }
    }

    /// Number of entries across all labels.
    pub fn len(&self) -> usize {
        self.state.read().maps.iter().map(BTreeMap::len).sum()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry counts per label, in [`ShapeLabel::ALL`] order.
    pub fn counts(&self) -> [usize; 3] {
        let state = self.state.read();
        [state.maps[0].len(), state.maps[1].len(), state.maps[2].len()]
    }
}
