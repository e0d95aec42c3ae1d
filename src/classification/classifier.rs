//! Per-candidate fit → reject → classify.

use super::fitter::{FitterConfig, SuperquadricFitter};
use super::label::ShapeLabel;
use super::rules::{ClassifierConfig, DecisionTable};
use super::superquadric::SuperquadricFit;
use crate::segmentation::ObjectCandidate;

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    /// Fit accepted and a table row matched.
    Recognized {
        /// Assigned label.
        label: ShapeLabel,
        /// The accepted fit.
        fit: SuperquadricFit,
    },
    /// Fit residual above the quality threshold; dropped.
    Rejected {
        /// Relative residual of the rejected fit.
        residual: f32,
    },
    /// Fit accepted but no row matched; dropped.
    Unclassified {
        /// The fit that matched nothing.
        fit: SuperquadricFit,
    },
    /// Too few points to fit; dropped.
    Unfittable {
        /// Candidate size.
        points: usize,
    },
}

impl ClassificationOutcome {
    /// The label, if recognized.
    pub fn label(&self) -> Option<ShapeLabel> {
        match self {
            ClassificationOutcome::Recognized { label, .. } => Some(*label),
            _ => None,
        }
    }
}

/// Fits and classifies object candidates.
#[derive(Debug, Clone)]
pub struct ShapeClassifier {
    fitter: SuperquadricFitter,
    table: DecisionTable,
}

impl ShapeClassifier {
    /// Create a classifier.
    pub fn new(fitting: FitterConfig, classifier: ClassifierConfig) -> Self {
        Self {
            fitter: SuperquadricFitter::new(fitting),
            table: DecisionTable::new(classifier),
        }
    }

    /// The decision table.
    pub fn table(&self) -> &DecisionTable {
        &self.table
    }

    /// Fit, check quality and classify one candidate.
    pub fn classify(&self, candidate: &ObjectCandidate) -> ClassificationOutcome {
        match self.fitter.fit(candidate) {
            Some(fit) => self.classify_fit(fit),
            None => ClassificationOutcome::Unfittable {
                points: candidate.len(),
            },
        }
    }

    /// Check quality and classify an existing fit.
    pub fn classify_fit(&self, fit: SuperquadricFit) -> ClassificationOutcome {
        let max_residual = self.table.config().max_residual;
        if !fit.residual.is_finite() || fit.residual > max_residual {
            log::trace!(
                "Fit rejected: residual {:.3} > {:.3} (e1={:.2}, e2={:.2})",
                fit.residual,
                max_residual,
                fit.e1,
                fit.e2
            );
            return ClassificationOutcome::Rejected {
                residual: fit.residual,
            };
        }
        match self.table.evaluate(&fit) {
            Some(label) => ClassificationOutcome::Recognized { label, fit },
            None => {
                log::trace!(
                    "Unclassified fit: e1={:.2}, e2={:.2}, scale={:?}",
                    fit.e1,
                    fit.e2,
                    fit.scale
                );
                ClassificationOutcome::Unclassified { fit }
            }
        }
    }
}

impl Default for ShapeClassifier {
    fn default() -> Self {
        Self::new(FitterConfig::default(), ClassifierConfig::default())
    }
}
