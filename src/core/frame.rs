//! Coordinate frame identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a coordinate frame (e.g. `base_link`, `camera_depth_optical_frame`).
///
/// Every geometric value in the pipeline carries one of these so a value can
/// never be silently interpreted in the wrong frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Create a frame identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Frame name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for an empty name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for FrameId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FrameId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
