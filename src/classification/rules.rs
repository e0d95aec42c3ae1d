//! Shape decision table.
//!
//! Maps a fit's exponents and scales to a label through explicit rows:
//!
//! | Label    | e1     | e2     | Scales     |
//! |----------|--------|--------|------------|
//! | sphere   | round  | round  | isotropic  |
//! | cube     | square | square | any        |
//! | cylinder | square | round  | axial z    |
//! | cylinder | round  | square | elongated  |
//!
//! `round` is `|e − 1| ≤ round_tolerance`, `square` is `e ≥ square_threshold`.
//! `axial z` asks for a circular cross-section (x and y scales alike) and a
//! z scale that stands out, which is an upright cylinder in the model frame.
//! The last row is a square prism with rounded ends rather than a true
//! cylinder. It is kept so that a fit with the exponents swapped still
//! counts as a cylinder when one axis stands out. The fitter tries every
//! axis as the model z, so a real cylinder normally lands on the third row.
//! When rows of different labels match (overlapping bands), the label whose
//! canonical exponents are closest in log space wins.

use serde::{Deserialize, Serialize};

use super::label::ShapeLabel;
use super::superquadric::SuperquadricFit;
use crate::config::{ConfigError, ensure_positive};

/// Tolerance bands for classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Exponent counts as round if within this distance of 1.
    /// Default: 0.4
    pub round_tolerance: f32,

    /// Exponent counts as square at or above this value.
    /// Default: 2.5
    pub square_threshold: f32,

    /// Scales are isotropic if max/min ≤ 1 + this.
    /// Default: 0.2
    pub isotropy_tolerance: f32,

    /// One scale is "markedly different" if it differs from the other two
    /// by at least this ratio.
    /// Default: 1.3
    pub elongation_ratio: f32,

    /// Fits with a relative residual above this are rejected.
    /// Default: 0.1
    pub max_residual: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            round_tolerance: 0.4,
            square_threshold: 2.5,
            isotropy_tolerance: 0.2,
            elongation_ratio: 1.3,
            max_residual: 0.1,
        }
    }
}

impl ClassifierConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("classifier.round_tolerance", self.round_tolerance)?;
        ensure_positive("classifier.isotropy_tolerance", self.isotropy_tolerance)?;
        ensure_positive("classifier.max_residual", self.max_residual)?;
        if !(self.square_threshold.is_finite() && self.square_threshold > 1.0) {
            return Err(ConfigError::invalid(
                "classifier.square_threshold",
                format!("must be greater than 1 (got {})", self.square_threshold),
            ));
        }
        if !(self.elongation_ratio.is_finite() && self.elongation_ratio > 1.0) {
            return Err(ConfigError::invalid(
                "classifier.elongation_ratio",
                format!("must be greater than 1 (got {})", self.elongation_ratio),
            ));
        }
        Ok(())
    }
}

/// Exponent region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExponentBand {
    /// Near 1 (elliptical profile).
    Round,
    /// Large (rectangular profile).
    Square,
}

impl ExponentBand {
    /// Whether `e` lies in this band.
    pub fn contains(self, e: f32, config: &ClassifierConfig) -> bool {
        match self {
            ExponentBand::Round => (e - 1.0).abs() <= config.round_tolerance,
            ExponentBand::Square => e >= config.square_threshold,
        }
    }

    /// Log-space distance from `e` to the band's canonical value.
    ///
    /// Zero anywhere inside the square band.
    pub fn distance(self, e: f32, config: &ClassifierConfig) -> f32 {
        let e = e.max(f32::MIN_POSITIVE);
        match self {
            ExponentBand::Round => e.ln().abs(),
            ExponentBand::Square => (config.square_threshold.ln() - e.ln()).max(0.0),
        }
    }
}

/// Condition on the three semi-axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleCondition {
    /// No constraint.
    Any,
    /// All three approximately equal.
    Isotropic,
    /// Exactly one differs markedly from the other two.
    Elongated,
    /// x and y alike, z differs markedly from both.
    AxialZ,
}

impl ScaleCondition {
    /// Whether `scale` satisfies the condition.
    pub fn holds(self, scale: [f32; 3], config: &ClassifierConfig) -> bool {
        let [x, y, z] = scale;
        let mut s = scale;
        s.sort_by(f32::total_cmp);
        let [small, mid, large] = s;
        if small <= 0.0 {
            return false;
        }
        let similar = |a: f32, b: f32| b / a <= 1.0 + config.isotropy_tolerance;
        let distinct = |a: f32, b: f32| b / a >= config.elongation_ratio;
        match self {
            ScaleCondition::Any => true,
            ScaleCondition::Isotropic => similar(small, large),
            ScaleCondition::Elongated => {
                (similar(small, mid) && distinct(mid, large))
                    || (distinct(small, mid) && similar(mid, large))
            }
            ScaleCondition::AxialZ => {
                let (lo, hi) = (x.min(y), x.max(y));
                similar(lo, hi) && (distinct(hi, z) || distinct(z, lo))
            }
        }
    }
}

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeRule {
    /// Label assigned when the row matches.
    pub label: ShapeLabel,
    /// Band for `e1`.
    pub e1: ExponentBand,
    /// Band for `e2`.
    pub e2: ExponentBand,
    /// Scale condition.
    pub scale: ScaleCondition,
}

impl ShapeRule {
    /// Whether `fit` matches this row.
    pub fn matches(&self, fit: &SuperquadricFit, config: &ClassifierConfig) -> bool {
        self.e1.contains(fit.e1, config)
            && self.e2.contains(fit.e2, config)
            && self.scale.holds(fit.scale, config)
    }

    /// Distance from `fit`'s exponents to this row's canonical exponents.
    pub fn distance(&self, fit: &SuperquadricFit, config: &ClassifierConfig) -> f32 {
        let d1 = self.e1.distance(fit.e1, config);
        let d2 = self.e2.distance(fit.e2, config);
        (d1 * d1 + d2 * d2).sqrt()
    }
}

/// The full table.
#[derive(Debug, Clone)]
pub struct DecisionTable {
    rules: Vec<ShapeRule>,
    config: ClassifierConfig,
}

impl DecisionTable {
    /// The standard sphere / cube / cylinder table.
    pub fn new(config: ClassifierConfig) -> Self {
        use ExponentBand::{Round, Square};
        let rules = vec![
            ShapeRule {
                label: ShapeLabel::Sphere,
                e1: Round,
                e2: Round,
                scale: ScaleCondition::Isotropic,
            },
            ShapeRule {
                label: ShapeLabel::Cube,
                e1: Square,
                e2: Square,
                scale: ScaleCondition::Any,
            },
            ShapeRule {
                label: ShapeLabel::Cylinder,
                e1: Square,
                e2: Round,
                scale: ScaleCondition::AxialZ,
            },
            ShapeRule {
                label: ShapeLabel::Cylinder,
                e1: Round,
                e2: Square,
                scale: ScaleCondition::Elongated,
            },
        ];
        Self { rules, config }
    }

    /// Rows in evaluation order.
    pub fn rules(&self) -> &[ShapeRule] {
        &self.rules
    }

    /// Bands in use.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Label for `fit`, or `None` if no row matches.
    pub fn evaluate(&self, fit: &SuperquadricFit) -> Option<ShapeLabel> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(fit, &self.config))
            .map(|rule| (rule.label, rule.distance(fit, &self.config)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(label, _)| label)
    }
}

impl Default for DecisionTable {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FrameId, Point3D};
    use nalgebra::UnitQuaternion;

    fn fit(e1: f32, e2: f32, scale: [f32; 3]) -> SuperquadricFit {
        SuperquadricFit {
            frame: FrameId::new("base_link"),
            position: Point3D::origin(),
            orientation: UnitQuaternion::identity(),
            scale,
            e1,
            e2,
            residual: 0.01,
            support: 100,
        }
    }

    #[test]
    fn test_canonical_shapes() {
        let table = DecisionTable::default();
        assert_eq!(
            table.evaluate(&fit(1.0, 1.0, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Sphere)
        );
        assert_eq!(
            table.evaluate(&fit(10.0, 10.0, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Cube)
        );
        assert_eq!(
            table.evaluate(&fit(8.0, 1.0, [0.03, 0.03, 0.1])),
            Some(ShapeLabel::Cylinder)
        );
        assert_eq!(
            table.evaluate(&fit(1.0, 8.0, [0.1, 0.03, 0.03])),
            Some(ShapeLabel::Cylinder)
        );
    }

    #[test]
    fn test_cube_ignores_scale() {
        let table = DecisionTable::default();
        assert_eq!(
            table.evaluate(&fit(6.0, 4.0, [0.02, 0.05, 0.2])),
            Some(ShapeLabel::Cube)
        );
    }

    // ========================================================================
    // Unclassified
    // ========================================================================

    #[test]
    fn test_round_but_anisotropic_is_unclassified() {
        // Ellipsoid: round exponents, unequal scales
        let table = DecisionTable::default();
        assert_eq!(table.evaluate(&fit(1.0, 1.0, [0.02, 0.05, 0.1])), None);
    }

    #[test]
    fn test_between_bands_is_unclassified() {
        let table = DecisionTable::default();
        assert_eq!(table.evaluate(&fit(1.8, 1.8, [0.05, 0.05, 0.05])), None);
        assert_eq!(table.evaluate(&fit(0.3, 0.3, [0.05, 0.05, 0.05])), None);
    }

    #[test]
    fn test_cylinder_needs_elongation() {
        let table = DecisionTable::default();
        assert_eq!(table.evaluate(&fit(8.0, 1.0, [0.05, 0.05, 0.05])), None);
        // Three different scales: nothing stands out alone
        assert_eq!(table.evaluate(&fit(8.0, 1.0, [0.02, 0.04, 0.08])), None);
    }

    #[test]
    fn test_round_cross_section_needs_z_axis() {
        let table = DecisionTable::default();
        // Long axis along model x: the round cross-section is an ellipse
        assert_eq!(table.evaluate(&fit(8.0, 1.0, [0.1, 0.03, 0.03])), None);
        // Short upright cylinder (puck)
        assert_eq!(
            table.evaluate(&fit(8.0, 1.0, [0.05, 0.05, 0.02])),
            Some(ShapeLabel::Cylinder)
        );
    }

    // ========================================================================
    // Band boundaries
    // ========================================================================

    #[test]
    fn test_band_edges_inclusive() {
        let table = DecisionTable::default();
        assert_eq!(
            table.evaluate(&fit(1.4, 0.6, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Sphere)
        );
        assert_eq!(
            table.evaluate(&fit(2.5, 2.5, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Cube)
        );
    }

    #[test]
    fn test_overlapping_bands_pick_closest() {
        // Round band [0, 3] overlaps square band [2.5, ∞)
        let config = ClassifierConfig {
            round_tolerance: 2.0,
            ..ClassifierConfig::default()
        };
        let table = DecisionTable::new(config);

        // Both sphere and cube rows match; cube prototype is closer
        assert_eq!(
            table.evaluate(&fit(2.8, 2.8, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Cube)
        );
        // Only the sphere row matches
        assert_eq!(
            table.evaluate(&fit(1.1, 0.9, [0.05, 0.05, 0.05])),
            Some(ShapeLabel::Sphere)
        );
    }

    #[test]
    fn test_scale_conditions() {
        let config = ClassifierConfig::default();
        assert!(ScaleCondition::Isotropic.holds([0.05, 0.055, 0.058], &config));
        assert!(!ScaleCondition::Isotropic.holds([0.05, 0.05, 0.08], &config));
        assert!(ScaleCondition::Elongated.holds([0.03, 0.031, 0.1], &config));
        // Disc: one short axis
        assert!(ScaleCondition::Elongated.holds([0.01, 0.05, 0.052], &config));
        assert!(!ScaleCondition::Elongated.holds([0.0, 0.05, 0.1], &config));
        assert!(ScaleCondition::AxialZ.holds([0.04, 0.041, 0.1], &config));
        assert!(!ScaleCondition::AxialZ.holds([0.1, 0.04, 0.041], &config));
        assert!(!ScaleCondition::AxialZ.holds([0.04, 0.041, 0.045], &config));
    }

    #[test]
    fn test_validate() {
        assert!(ClassifierConfig::default().validate().is_ok());
        let bad = ClassifierConfig {
            square_threshold: 0.9,
            ..ClassifierConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = ClassifierConfig {
            max_residual: -1.0,
            ..ClassifierConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
