//! Orchestration layer.
//!
//! - [`ShapePipeline`]: one recognition cycle, stage by stage
//! - [`ShapeRecognition`]: ingestion, enable/disable, object query

mod module;
mod pipeline;

pub use module::ShapeRecognition;
pub use pipeline::{CycleError, CycleReport, ShapePipeline, Stage};
