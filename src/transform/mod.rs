//! Frame transform manager.
//!
//! Keeps the sensor → reference transforms and decides whether a captured
//! snapshot is still usable.
//!
//! - [`TransformBuffer`]: latest transform per frame pair, multi-hop lookups
//! - [`TransformSource`]: lookup seam (the buffer, or any transport-backed source)
//! - [`FrameTransformManager`]: capture + staleness bound
//! - [`TransformSnapshot`]: one captured transform with its stamp

mod buffer;
mod error;
mod manager;
mod snapshot;

pub use buffer::{TransformBuffer, TransformSource};
pub use error::TransformError;
pub use manager::FrameTransformManager;
pub use snapshot::TransformSnapshot;
