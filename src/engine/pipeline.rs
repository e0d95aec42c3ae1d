//! One recognition cycle: cloud in, registry updated.
//!
//! ```text
//! capture T(cloud→reference) ─► transform ─► crop + voxel ─► plane removal
//!     ─► clustering ─► staleness re-check ─► fit + classify ─► registry batch
//! ```
//!
//! Every stage boundary checks the run permit; a disable observed there ends
//! the cycle without touching the registry. Transform failures abort the
//! cycle and are retried on the next trigger. An empty intermediate result
//! is a valid, empty cycle.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::classification::{ClassificationOutcome, ShapeClassifier};
use crate::config::AkritiConfig;
use crate::core::{Clock, FrameId, PointCloud};
use crate::preprocessing::GeometricFilter;
use crate::registry::{ObjectRegistry, RecognizedObject, RegistryError, UpsertOutcome};
use crate::segmentation::{EuclideanClusterer, PlaneExtractor, PlaneModel};
use crate::sensors::RunPermit;
use crate::transform::{FrameTransformManager, TransformError, TransformSnapshot};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Transform capture and cloud transformation.
    Transform,
    /// Crop box and voxel grid.
    Filter,
    /// Support plane removal.
    Plane,
    /// Euclidean clustering.
    Cluster,
    /// Superquadric fitting and classification.
    Classify,
    /// Registry update.
    Register,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Transform => "transform",
            Stage::Filter => "filter",
            Stage::Plane => "plane",
            Stage::Cluster => "cluster",
            Stage::Classify => "classify",
            Stage::Register => "register",
        };
        f.write_str(name)
    }
}

/// Why a cycle ended early. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// Reference-frame transform missing, stale or mismatched.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The module was disabled while the cycle was running.
    #[error("module disabled before the {stage} stage")]
    Disabled {
        /// Stage that observed the disable.
        stage: Stage,
    },

    /// Registry refused the batch.
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for CycleError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Inactive => CycleError::Disabled {
                stage: Stage::Register,
            },
            other => CycleError::Registry(other),
        }
    }
}

/// Per-stage statistics of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Stamp of the processed cloud (µs).
    pub stamp_us: u64,
    /// Points in the raw cloud.
    pub raw_points: usize,
    /// Points left after cropping.
    pub cropped: usize,
    /// Points left after voxel downsampling.
    pub downsampled: usize,
    /// Points removed as the support plane.
    pub plane_inliers: usize,
    /// Points left after plane removal.
    pub remaining: usize,
    /// The removed plane, if any.
    pub plane: Option<PlaneModel>,
    /// Candidates passed to classification.
    pub clusters: usize,
    /// Candidates too small to fit.
    pub unfittable: usize,
    /// Fits above the residual threshold.
    pub fits_rejected: usize,
    /// Fits matching no decision-table row.
    pub unclassified: usize,
    /// New registry entries.
    pub inserted: usize,
    /// Detections merged into existing entries.
    pub merged: usize,
    /// Objects recognized this cycle, in the reference frame.
    pub objects: Vec<RecognizedObject>,
}

impl CycleReport {
    fn new(stamp_us: u64, raw_points: usize) -> Self {
        Self {
            stamp_us,
            raw_points,
            ..Default::default()
        }
    }

    /// Number of objects recognized this cycle.
    pub fn recognized(&self) -> usize {
        self.objects.len()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} raw → {} cropped → {} voxels → {} off-plane ({} plane) → {} clusters → \
             {} recognized ({} rejected, {} unclassified, {} unfittable), {} new, {} merged",
            self.raw_points,
            self.cropped,
            self.downsampled,
            self.remaining,
            self.plane_inliers,
            self.clusters,
            self.recognized(),
            self.fits_rejected,
            self.unclassified,
            self.unfittable,
            self.inserted,
            self.merged
        )
    }
}

/// Chains the recognition stages.
pub struct ShapePipeline {
    reference_frame: FrameId,
    transforms: FrameTransformManager,
    clock: Arc<dyn Clock>,
    filter: GeometricFilter,
    plane: PlaneExtractor,
    clusterer: EuclideanClusterer,
    classifier: ShapeClassifier,
}

impl ShapePipeline {
    /// Build the stages from a validated configuration.
    pub fn new(
        config: &AkritiConfig,
        transforms: FrameTransformManager,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reference_frame: config.frames.reference_frame.clone(),
            transforms,
            clock,
            filter: GeometricFilter::new(config.filter),
            plane: PlaneExtractor::new(config.plane),
            clusterer: EuclideanClusterer::new(config.cluster),
            classifier: ShapeClassifier::new(config.fitting, config.classifier),
        }
    }

    /// Frame all results are expressed in.
    pub fn reference_frame(&self) -> &FrameId {
        &self.reference_frame
    }

    /// Transform manager used for captures.
    pub fn transforms(&self) -> &FrameTransformManager {
        &self.transforms
    }

    /// The classifier.
    pub fn classifier(&self) -> &ShapeClassifier {
        &self.classifier
    }

    fn checkpoint(&self, permit: &RunPermit<'_>, stage: Stage) -> Result<(), CycleError> {
        if permit.still_active() {
            Ok(())
        } else {
            log::debug!("Cycle cancelled before {} stage", stage);
            Err(CycleError::Disabled { stage })
        }
    }

    /// Capture a fresh snapshot mapping `frame` into the reference frame.
    pub fn capture(&self, frame: &FrameId) -> Result<TransformSnapshot, TransformError> {
        self.transforms
            .capture_fresh(frame, &self.reference_frame, self.clock.now_us())
    }

    /// Run one cycle on `cloud` and apply the detections to `registry`.
    pub fn run(
        &self,
        cloud: &PointCloud,
        permit: &RunPermit<'_>,
        registry: &ObjectRegistry,
    ) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::new(cloud.stamp_us(), cloud.len());

        // Transform
        self.checkpoint(permit, Stage::Transform)?;
        let snapshot = self.capture(cloud.frame())?;
        let cloud = snapshot.apply_cloud(cloud)?;

        // Filter
        self.checkpoint(permit, Stage::Filter)?;
        let (filtered, stats) = self.filter.process(&cloud);
        report.cropped = stats.cropped;
        report.downsampled = stats.downsampled;
        if filtered.is_empty() {
            log::debug!("No points inside the workspace");
            return Ok(report);
        }

        // Plane
        self.checkpoint(permit, Stage::Plane)?;
        let extraction = self.plane.extract(&filtered);
        report.plane_inliers = extraction.inliers;
        report.remaining = extraction.remaining.len();
        report.plane = extraction.plane;
        if extraction.remaining.is_empty() {
            log::debug!("Nothing left above the support plane");
            return Ok(report);
        }

        // Cluster
        self.checkpoint(permit, Stage::Cluster)?;
        let (candidates, _) = self.clusterer.segment(&extraction.remaining);
        report.clusters = candidates.len();
        if candidates.is_empty() {
            log::debug!("No object clusters");
            return Ok(report);
        }

        // The snapshot may have aged while segmenting
        self.transforms
            .ensure_fresh(&snapshot, self.clock.now_us())?;

        // Classify
        let mut objects = Vec::new();
        for candidate in candidates {
            self.checkpoint(permit, Stage::Classify)?;
            let candidate = candidate.into_frame(&snapshot)?;
            match self.classifier.classify(&candidate) {
                ClassificationOutcome::Recognized { label, fit } => {
                    log::debug!(
                        "Candidate {} ({} pts): {} e=({:.2}, {:.2}) residual {:.3}",
                        candidate.index,
                        candidate.len(),
                        label,
                        fit.e1,
                        fit.e2,
                        fit.residual
                    );
                    objects.push(RecognizedObject::from_fit(label, &fit, report.stamp_us));
                }
                ClassificationOutcome::Rejected { .. } => report.fits_rejected += 1,
                ClassificationOutcome::Unclassified { .. } => report.unclassified += 1,
                ClassificationOutcome::Unfittable { .. } => report.unfittable += 1,
            }
        }
        if objects.is_empty() {
            return Ok(report);
        }

        // Register
        self.checkpoint(permit, Stage::Register)?;
        let outcomes = registry.upsert_batch(objects.clone(), || permit.still_active())?;
        for outcome in outcomes {
            match outcome {
                UpsertOutcome::Inserted(_) => report.inserted += 1,
                UpsertOutcome::Merged { .. } => report.merged += 1,
            }
        }
        report.objects = objects;
        Ok(report)
    }
}

impl fmt::Debug for ShapePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapePipeline")
            .field("reference_frame", &self.reference_frame)
            .field("transforms", &self.transforms)
            .finish_non_exhaustive()
    }
}
