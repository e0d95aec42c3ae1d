//! Latest-sample buffers for ingested sensor data.
//!
//! Each stream keeps only its most recent sample. Writers replace it under a
//! short lock; readers get a cheap `Arc` clone.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{ColorImage, DepthImage, PointCloud, Timestamped};

/// Holds the most recent sample of one stream.
#[derive(Debug)]
pub struct LatestSample<T> {
    slot: Mutex<Option<Timestamped<Arc<T>>>>,
}

impl<T> LatestSample<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Replace the buffered sample.
    pub fn store(&self, data: T, timestamp_us: u64) {
        *self.slot.lock() = Some(Timestamped::new(Arc::new(data), timestamp_us));
    }

    /// Clone out the buffered sample, if any.
    pub fn latest(&self) -> Option<Timestamped<Arc<T>>> {
        self.slot.lock().clone()
    }

    /// Drop the buffered sample.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Whether a sample is buffered.
    pub fn has_sample(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Default for LatestSample<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffers for the three sensor streams.
#[derive(Debug, Default)]
pub struct SensorBuffers {
    /// Latest RGB image.
    pub color: LatestSample<ColorImage>,
    /// Latest depth image.
    pub depth: LatestSample<DepthImage>,
    /// Latest point cloud.
    pub cloud: LatestSample<PointCloud>,
}

impl SensorBuffers {
    /// Drop all buffered samples.
    pub fn clear(&self) {
        self.color.clear();
        self.depth.clear();
        self.cloud.clear();
    }
}
