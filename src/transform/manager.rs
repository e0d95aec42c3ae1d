//! Frame transform manager: snapshot capture with staleness checks.

use std::sync::Arc;

use super::buffer::TransformSource;
use super::error::TransformError;
use super::snapshot::TransformSnapshot;
use crate::core::FrameId;

/// Captures sensor → reference snapshots and judges their age.
#[derive(Clone)]
pub struct FrameTransformManager {
    source: Arc<dyn TransformSource>,
    max_age_us: u64,
}

impl FrameTransformManager {
    /// Create a manager over `source` with a staleness bound in milliseconds.
    pub fn new(source: Arc<dyn TransformSource>, max_age_ms: u64) -> Self {
        Self {
            source,
            max_age_us: max_age_ms.saturating_mul(1_000),
        }
    }

    /// Staleness bound in milliseconds.
    pub fn max_age_ms(&self) -> u64 {
        self.max_age_us / 1_000
    }

    /// Best available snapshot mapping `source` into `target`. Never blocks.
    pub fn capture(
        &self,
        source: &FrameId,
        target: &FrameId,
    ) -> Result<TransformSnapshot, TransformError> {
        self.source.lookup(source, target)
    }

    /// True if `snapshot` is older than the staleness bound at `now_us`.
    pub fn is_stale(&self, snapshot: &TransformSnapshot, now_us: u64) -> bool {
        snapshot.age_us(now_us) > self.max_age_us
    }

    /// Fail with [`TransformError::Stale`] if `snapshot` is too old.
    pub fn ensure_fresh(
        &self,
        snapshot: &TransformSnapshot,
        now_us: u64,
    ) -> Result<(), TransformError> {
        if self.is_stale(snapshot, now_us) {
            Err(TransformError::Stale {
                source_frame: snapshot.source().clone(),
                target_frame: snapshot.target().clone(),
                age_ms: snapshot.age_us(now_us) / 1_000,
                max_age_ms: self.max_age_ms(),
            })
        } else {
            Ok(())
        }
    }

    /// Capture and require freshness in one step.
    pub fn capture_fresh(
        &self,
        source: &FrameId,
        target: &FrameId,
        now_us: u64,
    ) -> Result<TransformSnapshot, TransformError> {
        let snapshot = self.capture(source, target)?;
        self.ensure_fresh(&snapshot, now_us)?;
        Ok(snapshot)
    }
}

impl std::fmt::Debug for FrameTransformManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransformManager")
            .field("max_age_us", &self.max_age_us)
            .finish_non_exhaustive()
    }
}
