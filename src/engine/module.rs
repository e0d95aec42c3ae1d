//! The shape-recognition module: ingestion, control, query.
//!
//! Transport callbacks call the `on_*` methods, which only buffer the sample
//! and raise a readiness flag. Whoever calls [`ShapeRecognition::spin_once`]
//! runs the pipeline when all streams are ready; at most one run is ever in
//! flight. All methods take `&self`, so the module can be shared behind an
//! `Arc` between ingestion, the pipeline thread and query handlers.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use super::pipeline::{CycleError, CycleReport, ShapePipeline};
use crate::classification::ShapeLabel;
use crate::config::{AkritiConfig, ConfigError};
use crate::core::{Clock, ColorImage, DepthImage, FrameId, PointCloud};
use crate::io::{
    GetObjectsRequest, GetObjectsResponse, OverlayRenderer, SetActiveRequest, SetActiveResponse,
};
use crate::registry::{ObjectRegistry, RecognizedObject};
use crate::sensors::{SensorBuffers, Stream, StreamSynchronizer, SyncState};
use crate::transform::{FrameTransformManager, TransformSource};

/// Tabletop shape recognition.
pub struct ShapeRecognition {
    config: AkritiConfig,
    sync: StreamSynchronizer,
    buffers: SensorBuffers,
    registry: ObjectRegistry,
    pipeline: ShapePipeline,
    overlay: OverlayRenderer,
    latest_overlay: Mutex<Option<ColorImage>>,
    warned_frames: Mutex<HashSet<(Stream, FrameId)>>,
}

impl ShapeRecognition {
    /// Validate `config` and build the module.
    ///
    /// This is the only place a [`ConfigError`] can surface; once built the
    /// module never fails fatally.
    pub fn new(
        config: AkritiConfig,
        transforms: Arc<dyn TransformSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let manager = FrameTransformManager::new(transforms, config.frames.max_transform_age_ms);
        let pipeline = ShapePipeline::new(&config, manager, clock);
        let registry = ObjectRegistry::new(config.registry, config.frames.reference_frame.clone());

        log::info!(
            "Shape recognition ready: reference frame `{}`, cloud frame `{}`, {}",
            config.frames.reference_frame,
            config.frames.cloud_frame,
            if config.start_active {
                "active"
            } else {
                "inactive"
            }
        );

        Ok(Self {
            sync: StreamSynchronizer::new(config.start_active),
            buffers: SensorBuffers::default(),
            registry,
            pipeline,
            overlay: OverlayRenderer::new(config.overlay),
            latest_overlay: Mutex::new(None),
            warned_frames: Mutex::new(HashSet::new()),
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AkritiConfig {
        &self.config
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Buffer a color image. Never blocks on a pipeline run.
    pub fn on_color_image(&self, image: ColorImage) {
        if !self.accepting(Stream::Color) {
            return;
        }
        self.check_frame(Stream::Color, &image.frame, &self.config.frames.color_frame);
        let stamp = image.stamp_us;
        self.buffers.color.store(image, stamp);
        self.sync.mark_ready(Stream::Color);
    }

    /// Buffer a depth image. Never blocks on a pipeline run.
    pub fn on_depth_image(&self, image: DepthImage) {
        if !self.accepting(Stream::Depth) {
            return;
        }
        self.check_frame(Stream::Depth, &image.frame, &self.config.frames.depth_frame);
        let stamp = image.stamp_us;
        self.buffers.depth.store(image, stamp);
        self.sync.mark_ready(Stream::Depth);
    }

    /// Buffer a point cloud. Never blocks on a pipeline run.
    pub fn on_point_cloud(&self, cloud: PointCloud) {
        if !self.accepting(Stream::Cloud) {
            return;
        }
        self.check_frame(Stream::Cloud, cloud.frame(), &self.config.frames.cloud_frame);
        let stamp = cloud.stamp_us();
        self.buffers.cloud.store(cloud, stamp);
        self.sync.mark_ready(Stream::Cloud);
    }

    fn accepting(&self, stream: Stream) -> bool {
        let active = self.sync.is_active();
        if !active {
            log::trace!("Dropping {} sample: module inactive", stream);
        }
        active
    }

    /// Samples in an unexpected frame are still used (looked up by their own
    /// frame); warn once per stream and frame.
    fn check_frame(&self, stream: Stream, actual: &FrameId, expected: &FrameId) {
        if actual == expected {
            return;
        }
        if self.warned_frames.lock().insert((stream, actual.clone())) {
            log::warn!(
                "{} sample in frame `{}`, configured `{}`; using the sample's frame",
                stream,
                actual,
                expected
            );
        }
    }

    /// Current readiness state.
    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Run one cycle if all streams are ready and no run is in flight.
    ///
    /// Returns `None` when nothing ran. Aborted cycles are logged and
    /// returned as errors; none of them are fatal.
    pub fn spin_once(&self) -> Option<Result<CycleReport, CycleError>> {
        let permit = match self.sync.try_begin_run() {
            Ok(permit) => permit,
            Err(gate) => {
                log::trace!("No cycle: {:?}", gate);
                return None;
            }
        };
        let cloud = self.buffers.cloud.latest()?;

        let result = self.pipeline.run(&cloud.data, &permit, &self.registry);
        match &result {
            Ok(report) => {
                log::debug!("Cycle @{}: {}", report.stamp_us, report);
                if self.overlay.config().enabled && permit.still_active() {
                    self.render_overlay();
                }
            }
            Err(CycleError::Transform(e)) => log::warn!("Cycle aborted: {}", e),
            Err(e) => log::debug!("Cycle aborted: {}", e),
        }
        Some(result)
    }

    fn render_overlay(&self) {
        let Some(image) = self.buffers.color.latest() else {
            return;
        };
        let snapshot = match self
            .pipeline
            .transforms()
            .capture(self.registry.frame(), &image.data.frame)
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::debug!("Skipping overlay: {}", e);
                return;
            }
        };
        let objects = self.registry.query(None);
        match self.overlay.render(&image.data, &objects, &snapshot) {
            Ok(rendered) => *self.latest_overlay.lock() = Some(rendered),
            Err(e) => log::debug!("Skipping overlay: {}", e),
        }
    }

    /// Latest annotated color image, if one has been rendered.
    pub fn debug_overlay(&self) -> Option<ColorImage> {
        self.latest_overlay.lock().clone()
    }

    // ========================================================================
    // Control and query
    // ========================================================================

    /// Whether cycles may be triggered.
    pub fn is_active(&self) -> bool {
        self.sync.is_active()
    }

    /// Enable or disable the module.
    ///
    /// Disabling stops triggering, cancels an in-flight cycle at its next
    /// stage boundary, and clears the registry and buffered samples.
    pub fn set_active(&self, request: SetActiveRequest) -> SetActiveResponse {
        let was_active = self.sync.is_active();
        // Flag first so an in-flight batch sees it under the registry lock
        self.sync.set_active(request.active);
        if !request.active {
            self.registry.clear();
            self.buffers.clear();
            *self.latest_overlay.lock() = None;
        }
        if was_active != request.active {
            log::info!(
                "Shape recognition {}",
                if request.active {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        SetActiveResponse { success: true }
    }

    /// Current registry contents.
    pub fn get_objects(&self, request: GetObjectsRequest) -> GetObjectsResponse {
        GetObjectsResponse::from_objects(&self.registry.query(request.label))
    }

    /// Registry entries, optionally of one label.
    pub fn objects(&self, label: Option<ShapeLabel>) -> Vec<RecognizedObject> {
        self.registry.query(label)
    }

    /// The object registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for ShapeRecognition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeRecognition")
            .field("active", &self.is_active())
            .field("state", &self.sync.state())
            .field("objects", &self.registry.len())
            .finish_non_exhaustive()
    }
}
