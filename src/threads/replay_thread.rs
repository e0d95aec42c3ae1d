//! Replay Thread - publishes a synthetic scene as if from a live sensor.
//!
//! Stands in for the transport layer: at a fixed rate it refreshes the
//! sensor → reference transforms and delivers a color image, a depth image
//! and a point cloud to the module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nalgebra::Isometry3;

use crate::config::FramesSection;
use crate::core::{Clock, ColorImage, DepthImage};
use crate::engine::ShapeRecognition;
use crate::io::SceneDescription;
use crate::transform::TransformBuffer;

/// Configuration for the replay thread.
#[derive(Debug, Clone)]
pub struct ReplayThreadConfig {
    /// Scene to publish.
    pub scene: SceneDescription,
    /// Frame names to publish under.
    pub frames: FramesSection,
    /// Publish rate (Hz).
    pub rate_hz: f32,
    /// Image size `(width, height)`.
    pub image_size: (u32, u32),
}

/// Replay Thread handle.
pub struct ReplayThread {
    handle: JoinHandle<()>,
}

impl ReplayThread {
    /// Spawn the replay thread.
    pub fn spawn(
        config: ReplayThreadConfig,
        module: Arc<ShapeRecognition>,
        transforms: Arc<TransformBuffer>,
        clock: Arc<dyn Clock>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("replay".into())
            .spawn(move || run_loop(config, module, transforms, clock, running))?;
        Ok(Self { handle })
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop(
    config: ReplayThreadConfig,
    module: Arc<ShapeRecognition>,
    transforms: Arc<TransformBuffer>,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
) {
    let period = Duration::from_secs_f32(1.0 / config.rate_hz.max(0.1));
    let frames = &config.frames;
    let mut scene = config.scene.clone();
    scene.frame = frames.reference_frame.clone();
    scene.sensor.frame = frames.cloud_frame.clone();
    let mount = scene.sensor.transform();
    let (width, height) = config.image_size;

    log::info!(
        "Replay thread starting: {} objects at {:.1} Hz",
        scene.objects.len(),
        config.rate_hz
    );

    // Color and depth cameras share the cloud sensor's mount
    for frame in [&frames.color_frame, &frames.depth_frame] {
        if frame != &frames.cloud_frame {
            transforms.set_static_transform(
                frames.cloud_frame.clone(),
                frame.clone(),
                Isometry3::identity(),
            );
        }
    }

    let mut published = 0u64;
    while running.load(Ordering::Relaxed) {
        let tick = Instant::now();
        let now = clock.now_us();

        transforms.set_transform(
            scene.frame.clone(),
            frames.cloud_frame.clone(),
            mount,
            now,
        );
        module.on_color_image(ColorImage::filled(
            frames.color_frame.clone(),
            now,
            width,
            height,
            [96, 96, 96],
        ));
        module.on_depth_image(DepthImage::filled(
            frames.depth_frame.clone(),
            now,
            width,
            height,
            mount.translation.vector.z,
        ));
        module.on_point_cloud(scene.sensor_cloud(now));

        published += 1;
        log::trace!("Published frame {}", published);

        if let Some(remaining) = period.checked_sub(tick.elapsed()) {
            thread::sleep(remaining);
        }
    }

    log::info!("Replay thread stopped after {} frames", published);
}
