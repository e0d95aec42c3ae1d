//! Primitive shape labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three recognized primitive families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeLabel {
    /// Round in every direction.
    Sphere,
    /// Rectangular in every direction.
    #[serde(alias = "box")]
    Cube,
    /// Round cross-section, flat ends, one long axis.
    Cylinder,
}

impl ShapeLabel {
    /// All labels in registry order.
    pub const ALL: [ShapeLabel; 3] = [ShapeLabel::Sphere, ShapeLabel::Cube, ShapeLabel::Cylinder];

    /// Stable index (0..3).
    pub fn index(self) -> usize {
        match self {
            ShapeLabel::Sphere => 0,
            ShapeLabel::Cube => 1,
            ShapeLabel::Cylinder => 2,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeLabel::Sphere => "sphere",
            ShapeLabel::Cube => "cube",
            ShapeLabel::Cylinder => "cylinder",
        }
    }
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sphere" => Ok(ShapeLabel::Sphere),
            "cube" | "box" => Ok(ShapeLabel::Cube),
            "cylinder" => Ok(ShapeLabel::Cylinder),
            other => Err(format!("unknown shape label: {}", other)),
        }
    }
}
