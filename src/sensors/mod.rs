//! Sensor ingestion: readiness gating and latest-sample buffers.

mod buffer;
mod sync;

pub use buffer::{LatestSample, SensorBuffers};
pub use sync::{Gate, RunPermit, Stream, StreamSynchronizer, SyncState};
