//! Akriti - tabletop primitive-shape recognition from RGB-D point clouds
//!
//! Recognizes spheres, cubes and cylinders resting on a support surface,
//! expresses them in a fixed reference frame, and keeps a deduplicated
//! registry of what has been seen.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   threads/                          │  ← Daemon threads
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← External surfaces
//! │          (messages, overlay, scenes)                │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │        (pipeline cycle, module control)             │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   registry/                         │  ← Shared state
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │  preprocessing/  segmentation/  classification/     │  ← Algorithms
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │          config/   sensors/   transform/            │  ← Infrastructure
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │        (points, clouds, frames, time, math)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Cycle
//!
//! Color, depth and cloud samples arrive independently. Once all three are
//! ready, one cycle runs: transform to the reference frame, crop, voxel
//! downsample, remove the support plane, cluster, fit a superquadric per
//! cluster, classify by decision table, merge into the registry.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Infrastructure (depends on core)
// ============================================================================
pub mod config;
pub mod sensors;
pub mod transform;

// ============================================================================
// Layer 3: Algorithms (depends on core, config, transform)
// ============================================================================
pub mod classification;
pub mod preprocessing;
pub mod segmentation;

// ============================================================================
// Layer 4: Registry (depends on classification)
// ============================================================================
pub mod registry;

// ============================================================================
// Layer 5: Engine (depends on all of the above)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 6: I/O surfaces
// ============================================================================
pub mod io;

// ============================================================================
// Layer 7: Daemon threads
// ============================================================================
pub mod threads;

pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::{Bounds3D, FrameId, Point3D, PointCloud};
pub use core::{Clock, ColorImage, DepthImage, ManualClock, SystemClock, Timestamped};

// Configuration
pub use config::{AkritiConfig, ConfigError};

// Frames
pub use transform::{
    FrameTransformManager, TransformBuffer, TransformError, TransformSnapshot, TransformSource,
};

// Algorithms
pub use classification::{
    ClassificationOutcome, ClassifierConfig, DecisionTable, FitterConfig, ShapeClassifier,
    ShapeLabel, SuperquadricFit, SuperquadricFitter,
};
pub use preprocessing::{CloudFilter, CropBox, FilterConfig, GeometricFilter, VoxelGrid};
pub use segmentation::{EuclideanClusterer, ObjectCandidate, PlaneExtractor, PlaneModel};

// Registry
pub use registry::{MergeStrategy, ObjectId, ObjectRegistry, RecognizedObject, RegistryConfig};

// Engine
pub use engine::{CycleError, CycleReport, ShapePipeline, ShapeRecognition};

// I/O
pub use io::{
    GetObjectsRequest, GetObjectsResponse, ObjectInfo, SceneDescription, SetActiveRequest,
    SetActiveResponse,
};

pub use error::{Error, Result};
