//! Pipeline Thread - drives recognition cycles.
//!
//! Polls the module for readiness and runs a cycle whenever all streams have
//! delivered. Sleeps between polls when there is nothing to do.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::ShapeRecognition;

/// Configuration for the pipeline thread.
#[derive(Debug, Clone)]
pub struct PipelineThreadConfig {
    /// Sleep between readiness polls.
    pub poll_interval: Duration,
    /// How often to log a summary of cycle counts.
    pub report_interval: Duration,
}

impl Default for PipelineThreadConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            report_interval: Duration::from_secs(5),
        }
    }
}

/// Pipeline Thread handle.
pub struct PipelineThread {
    handle: JoinHandle<()>,
}

impl PipelineThread {
    /// Spawn the pipeline thread.
    pub fn spawn(
        config: PipelineThreadConfig,
        module: Arc<ShapeRecognition>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("pipeline".into())
            .spawn(move || run_loop(config, module, running))?;
        Ok(Self { handle })
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

#[derive(Debug, Default)]
struct CycleCounts {
    completed: u64,
    aborted: u64,
    recognized: u64,
    busy_time: Duration,
}

fn run_loop(config: PipelineThreadConfig, module: Arc<ShapeRecognition>, running: Arc<AtomicBool>) {
    log::info!("Pipeline thread starting");

    let mut counts = CycleCounts::default();
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        let started = Instant::now();
        match module.spin_once() {
            Some(Ok(report)) => {
                counts.completed += 1;
                counts.recognized += report.recognized() as u64;
                counts.busy_time += started.elapsed();
            }
            Some(Err(_)) => {
                counts.aborted += 1;
                counts.busy_time += started.elapsed();
            }
            None => thread::sleep(config.poll_interval),
        }

        if last_report.elapsed() >= config.report_interval {
            let cycles = counts.completed + counts.aborted;
            let avg_ms = if cycles > 0 {
                counts.busy_time.as_secs_f64() * 1e3 / cycles as f64
            } else {
                0.0
            };
            log::info!(
                "Cycles: {} completed, {} aborted, {} detections, avg {:.1} ms; registry {}",
                counts.completed,
                counts.aborted,
                counts.recognized,
                avg_ms,
                module.registry().len()
            );
            counts = CycleCounts::default();
            last_report = Instant::now();
        }
    }

    log::info!("Pipeline thread stopped");
}
