//! Shape classification.
//!
//! Each object candidate is fitted with a superquadric, fits with a poor
//! residual are rejected, and the rest are mapped to a [`ShapeLabel`] by an
//! explicit [`DecisionTable`] over the shape exponents and scales.
//!
//! ```text
//! ObjectCandidate → SuperquadricFitter → residual check → DecisionTable → label | dropped
//! ```

mod classifier;
mod fitter;
mod label;
mod rules;
pub mod superquadric;

pub use classifier::{ClassificationOutcome, ShapeClassifier};
pub use fitter::{FitterConfig, MIN_EXPONENT_FLOOR, SuperquadricFitter};
pub use label::ShapeLabel;
pub use rules::{ClassifierConfig, DecisionTable, ExponentBand, ScaleCondition, ShapeRule};
pub use superquadric::SuperquadricFit;
