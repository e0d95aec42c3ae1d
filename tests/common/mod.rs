//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use akriti::{
    AkritiConfig, ColorImage, DepthImage, ManualClock, SceneDescription, ShapeRecognition,
    TransformBuffer,
};

/// Start of test time (µs).
pub const T0: u64 = 1_000_000_000;

/// Module wired to a manual clock and an in-memory transform buffer.
pub struct Harness {
    pub module: ShapeRecognition,
    pub transforms: Arc<TransformBuffer>,
    pub clock: Arc<ManualClock>,
    pub scene: SceneDescription,
}

impl Harness {
    /// Default configuration with a deterministic plane extractor.
    pub fn new() -> Self {
        let mut config = AkritiConfig::default();
        config.plane.seed = 42;
        Self::with_config(config)
    }

    /// Harness over the built-in tabletop scene.
    pub fn with_config(config: AkritiConfig) -> Self {
        let transforms = Arc::new(TransformBuffer::new());
        let clock = Arc::new(ManualClock::new(T0));
        let module = ShapeRecognition::new(config, transforms.clone(), clock.clone())
            .expect("valid config");
        Self {
            module,
            transforms,
            clock,
            scene: SceneDescription::tabletop(),
        }
    }

    /// Publish the camera mount transform stamped now.
    pub fn publish_transform(&self) {
        self.transforms.set_transform(
            "base_link",
            "camera_depth_optical_frame",
            self.scene.sensor.transform(),
            self.now(),
        );
    }

    /// Deliver one color, depth and cloud sample stamped now.
    pub fn publish_frame(&self) {
        let now = self.now();
        self.module.on_color_image(ColorImage::filled(
            "camera_color_optical_frame",
            now,
            640,
            480,
            [0, 0, 0],
        ));
        self.module.on_depth_image(DepthImage::filled(
            "camera_depth_optical_frame",
            now,
            640,
            480,
            1.0,
        ));
        self.module.on_point_cloud(self.scene.sensor_cloud(now));
    }

    /// Current test time.
    pub fn now(&self) -> u64 {
        use akriti::Clock;
        self.clock.now_us()
    }

    /// Advance test time.
    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance(ms * 1_000);
    }
}
