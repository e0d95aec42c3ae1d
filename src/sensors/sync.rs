//! Stream synchronizer.
//!
//! Tracks readiness of the three sensor streams and hands out at most one
//! [`RunPermit`] at a time. Ingestion only ever sets flags; the thread that
//! obtains a permit runs the pipeline.
//!
//! ```text
//! WaitingColor ─color─► WaitingDepth ─depth─► WaitingCloud ─cloud─► Ready
//!        ▲                                                            │
//!        └──────────── disable (reset) ◄─────── run start consumes cloud
//! ```
//!
//! The states are a view over three independent atomic flags; streams may
//! arrive in any order.
//!
//! Every disable starts a new generation. A permit remembers the generation it
//! was issued in, so a run that straddles a disable/enable pair still reads as
//! cancelled.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Sensor stream identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// RGB image.
    Color,
    /// Depth image.
    Depth,
    /// Point cloud.
    Cloud,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Color => write!(f, "color"),
            Stream::Depth => write!(f, "depth"),
            Stream::Cloud => write!(f, "cloud"),
        }
    }
}

/// Collapsed readiness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No color image since the last reset.
    WaitingColor,
    /// Color seen, no depth image yet.
    WaitingDepth,
    /// Images seen, no fresh cloud.
    WaitingCloud,
    /// All three streams ready.
    Ready,
}

/// Why a run could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Module disabled.
    Inactive,
    /// Another run is in flight.
    Busy,
    /// Not all streams ready.
    Waiting(SyncState),
}

/// Readiness flags plus the single-run gate.
#[derive(Debug)]
pub struct StreamSynchronizer {
    color: AtomicBool,
    depth: AtomicBool,
    cloud: AtomicBool,
    active: AtomicBool,
    running: AtomicBool,
    generation: AtomicU64,
}

impl StreamSynchronizer {
    /// Create a synchronizer with all flags cleared.
    pub fn new(active: bool) -> Self {
        Self {
            color: AtomicBool::new(false),
            depth: AtomicBool::new(false),
            cloud: AtomicBool::new(false),
            active: AtomicBool::new(active),
            running: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    fn flag(&self, stream: Stream) -> &AtomicBool {
        match stream {
            Stream::Color => &self.color,
            Stream::Depth => &self.depth,
            Stream::Cloud => &self.cloud,
        }
    }

    /// Mark a stream as having delivered a sample. Never blocks.
    pub fn mark_ready(&self, stream: Stream) {
        self.flag(stream).store(true, Ordering::Release);
    }

    /// Whether a given stream is ready.
    pub fn is_ready(&self, stream: Stream) -> bool {
        self.flag(stream).load(Ordering::Acquire)
    }

    /// True when all three streams are ready.
    pub fn all_ready(&self) -> bool {
        self.state() == SyncState::Ready
    }

    /// Current collapsed state.
    pub fn state(&self) -> SyncState {
        if !self.is_ready(Stream::Color) {
            SyncState::WaitingColor
        } else if !self.is_ready(Stream::Depth) {
            SyncState::WaitingDepth
        } else if !self.is_ready(Stream::Cloud) {
            SyncState::WaitingCloud
        } else {
            SyncState::Ready
        }
    }

    /// Whether runs may be triggered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Enable or disable triggering. Disabling clears all readiness flags
    /// and invalidates outstanding permits.
    pub fn set_active(&self, active: bool) {
        if !active {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.active.store(active, Ordering::Release);
        if !active {
            self.reset();
        }
    }

    /// Number of disables so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Clear all readiness flags.
    pub fn reset(&self) {
        self.color.store(false, Ordering::Release);
        self.depth.store(false, Ordering::Release);
        self.cloud.store(false, Ordering::Release);
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Try to start a pipeline run.
    ///
    /// Succeeds only when active, idle and all streams are ready. The cloud
    /// flag is consumed on success so the next run needs a fresh cloud;
    /// color and depth readiness persist.
    pub fn try_begin_run(&self) -> Result<RunPermit<'_>, Gate> {
        let generation = self.generation();
        if !self.is_active() {
            return Err(Gate::Inactive);
        }
        let state = self.state();
        if state != SyncState::Ready {
            return Err(Gate::Waiting(state));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Gate::Busy);
        }
        // Consume the cloud; if a concurrent reset took it first, back out.
        if !self.cloud.swap(false, Ordering::AcqRel) {
            self.running.store(false, Ordering::Release);
            return Err(Gate::Waiting(SyncState::WaitingCloud));
        }
        Ok(RunPermit {
            sync: self,
            generation,
        })
    }
}

impl Default for StreamSynchronizer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Exclusive right to run the pipeline once. Released on drop.
#[must_use = "the run gate is released as soon as the permit is dropped"]
pub struct RunPermit<'a> {
    sync: &'a StreamSynchronizer,
    generation: u64,
}

impl RunPermit<'_> {
    /// Cancellation check for stage boundaries.
    ///
    /// False once the module has been disabled since the permit was issued,
    /// even if it has been enabled again.
    pub fn still_active(&self) -> bool {
        self.sync.is_active() && self.sync.generation() == self.generation
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.sync.running.store(false, Ordering::Release);
    }
}

impl fmt::Debug for RunPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPermit")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
