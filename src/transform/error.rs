//! Transform lookup errors.

use thiserror::Error;

use crate::core::FrameId;

/// Failure to express data in the reference frame.
///
/// Per-cycle and self-healing: the current run is aborted and the next
/// readiness trigger tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// No chain of known transforms connects the two frames.
    #[error("no transform available from `{source_frame}` to `{target_frame}`")]
    Unavailable {
        /// Frame the data is expressed in.
        source_frame: FrameId,
        /// Frame requested.
        target_frame: FrameId,
    },

    /// The newest transform is older than the staleness bound.
    #[error(
        "transform `{source_frame}` -> `{target_frame}` is stale ({age_ms} ms old, max {max_age_ms} ms)"
    )]
    Stale {
        /// Frame the data is expressed in.
        source_frame: FrameId,
        /// Frame requested.
        target_frame: FrameId,
        /// Snapshot age in milliseconds.
        age_ms: u64,
        /// Configured bound in milliseconds.
        max_age_ms: u64,
    },

    /// A snapshot was applied to data in the wrong frame.
    #[error("frame mismatch: expected `{expected}`, got `{actual}`")]
    FrameMismatch {
        /// Frame the snapshot starts from.
        expected: FrameId,
        /// Frame the data is actually in.
        actual: FrameId,
    },
}
