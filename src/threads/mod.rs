//! Thread management for the recognition daemon.
//!
//! This module provides two threads:
//! - `ReplayThread`: publishes a synthetic scene and its transforms
//! - `PipelineThread`: runs recognition cycles whenever streams are ready

mod pipeline_thread;
mod replay_thread;

pub use pipeline_thread::{PipelineThread, PipelineThreadConfig};
pub use replay_thread::{ReplayThread, ReplayThreadConfig};
