//! Akriti daemon
//!
//! Runs shape recognition against a replayed synthetic tabletop scene and
//! periodically logs the object registry.
//!
//! # Usage
//!
//! ```bash
//! # Default config (configs/akriti.toml if present) and built-in scene
//! cargo run --release
//!
//! # Custom config and scene, stop after 30 s
//! cargo run --release -- --config configs/akriti.toml --scene configs/scene.toml --duration 30
//!
//! # Write the final registry as JSON on shutdown
//! cargo run --release -- --duration 10 --output objects.json
//! ```
//!
//! Besides the library sections, the config file may carry a `[daemon]`
//! section:
//!
//! ```toml
//! [daemon]
//! poll_interval_ms = 10
//! report_interval_s = 5
//! objects_interval_s = 2
//! replay_hz = 5.0
//! image_width = 640
//! image_height = 480
//! scene = "configs/scene.toml"
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Deserialize;

use akriti::threads::{PipelineThread, PipelineThreadConfig, ReplayThread, ReplayThreadConfig};
use akriti::{
    AkritiConfig, Clock, ConfigError, Error, GetObjectsRequest, GetObjectsResponse,
    SceneDescription, ShapeRecognition, SystemClock, TransformBuffer,
};

/// Tabletop sphere / cube / cylinder recognition daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: configs/akriti.toml if it exists)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene description to replay (default: built-in tabletop scene)
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Write the final object registry to this JSON file on shutdown
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DaemonConfig {
    poll_interval_ms: u64,
    report_interval_s: u64,
    objects_interval_s: u64,
    replay_hz: f32,
    image_width: u32,
    image_height: u32,
    scene: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            report_interval_s: 5,
            objects_interval_s: 2,
            replay_hz: 5.0,
            image_width: 640,
            image_height: 480,
            scene: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct DaemonFile {
    #[serde(default)]
    daemon: DaemonConfig,
}

fn load_config(path: Option<&Path>) -> Result<(AkritiConfig, DaemonConfig), ConfigError> {
    let Some(path) = path else {
        let path = Path::new(akriti::config::DEFAULT_CONFIG_PATH);
        if !path.exists() {
            return Ok((AkritiConfig::default(), DaemonConfig::default()));
        }
        return load_config(Some(path));
    };

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config = AkritiConfig::from_toml_str(&contents)?;
    let daemon: DaemonFile =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if daemon.daemon.replay_hz.is_nan() || daemon.daemon.replay_hz <= 0.0 {
        return Err(ConfigError::invalid(
            "daemon.replay_hz",
            "must be a positive number",
        ));
    }
    log::info!("Using config: {}", path.display());
    Ok((config, daemon.daemon))
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(1);
    }

    log::info!("akriti shutdown complete");
}

fn run(args: Args) -> akriti::Result<()> {
    let (config, daemon) = load_config(args.config.as_deref())?;

    let scene = match args.scene.as_ref().or(daemon.scene.as_ref()) {
        Some(path) => {
            log::info!("Scene: {}", path.display());
            SceneDescription::load(path)?
        }
        None => {
            log::info!("Scene: built-in tabletop");
            SceneDescription::tabletop()
        }
    };

    log::info!("akriti starting");
    log::info!("  Reference frame: {}", config.frames.reference_frame);
    log::info!("  Cloud frame: {}", config.frames.cloud_frame);
    log::info!(
        "  Voxel leaf: {} m, merge radius: {} m",
        config.filter.voxel.leaf_size,
        config.registry.merge_radius
    );

    let transforms = Arc::new(TransformBuffer::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let module = Arc::new(ShapeRecognition::new(
        config.clone(),
        transforms.clone(),
        clock.clone(),
    )?);

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let replay_thread = ReplayThread::spawn(
        ReplayThreadConfig {
            scene,
            frames: config.frames.clone(),
            rate_hz: daemon.replay_hz,
            image_size: (daemon.image_width, daemon.image_height),
        },
        module.clone(),
        transforms,
        clock,
        running.clone(),
    )?;
    let pipeline_thread = PipelineThread::spawn(
        PipelineThreadConfig {
            poll_interval: Duration::from_millis(daemon.poll_interval_ms.max(1)),
            report_interval: Duration::from_secs(daemon.report_interval_s.max(1)),
        },
        module.clone(),
        running.clone(),
    )?;

    log::info!("Daemon running");

    // Main thread logs the registry until shutdown
    let started = Instant::now();
    let objects_interval = Duration::from_secs(daemon.objects_interval_s.max(1));
    let mut last_objects = Instant::now();
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));

        if let Some(limit) = args.duration
            && started.elapsed() >= Duration::from_secs(limit)
        {
            log::info!("Duration of {} s reached", limit);
            running.store(false, Ordering::Relaxed);
        }

        if last_objects.elapsed() >= objects_interval {
            let response = module.get_objects(GetObjectsRequest::default());
            log::info!("Registry: {} objects", response.len());
            for object in &response.objects {
                log::info!(
                    "  #{} {} at ({:.3}, {:.3}, {:.3}) extent ({:.3}, {:.3}, {:.3}) [{}]",
                    object.id,
                    object.shape_label,
                    object.position[0],
                    object.position[1],
                    object.position[2],
                    object.extent[0],
                    object.extent[1],
                    object.extent[2],
                    object.frame_id
                );
            }
            last_objects = Instant::now();
        }
    }

    log::info!("Shutdown signal received, waiting for threads...");

    if let Err(e) = replay_thread.join() {
        log::error!("Replay thread panicked: {:?}", e);
    }
    if let Err(e) = pipeline_thread.join() {
        log::error!("Pipeline thread panicked: {:?}", e);
    }

    log::info!("All threads stopped");

    if let Some(path) = &args.output {
        write_objects(path, &module.get_objects(GetObjectsRequest::default()))?;
    }
    Ok(())
}

fn write_objects(path: &Path, response: &GetObjectsResponse) -> akriti::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| Error::Other(format!("Failed to encode objects: {}", e)))?;
    std::fs::write(path, json)?;
    log::info!("Wrote {} objects to {}", response.len(), path.display());
    Ok(())
}
