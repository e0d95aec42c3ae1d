//! Request/response types for the control and query surfaces.
//!
//! Serializable so any transport collaborator can carry them.

use serde::{Deserialize, Serialize};

use crate::classification::ShapeLabel;
use crate::registry::RecognizedObject;

// ============================================================================
// Enable / Disable
// ============================================================================

/// Enable or disable the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetActiveRequest {
    /// Desired state.
    pub active: bool,
}

/// Reply to [`SetActiveRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetActiveResponse {
    /// Whether the request was applied.
    pub success: bool,
}

// ============================================================================
// Object query
// ============================================================================

/// Query the registry, optionally for one label only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetObjectsRequest {
    /// Restrict to this label; `None` returns everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ShapeLabel>,
}

/// One recognized object as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Registry id.
    pub id: u64,
    /// Shape family.
    pub shape_label: ShapeLabel,
    /// Frame the pose is expressed in.
    pub frame_id: String,
    /// Center `[x, y, z]` in meters.
    pub position: [f32; 3],
    /// Orientation quaternion `[x, y, z, w]`.
    pub orientation: [f32; 4],
    /// Full box size along the object's axes, meters.
    pub extent: [f32; 3],
}

impl From<&RecognizedObject> for ObjectInfo {
    fn from(object: &RecognizedObject) -> Self {
        let q = object.orientation.quaternion();
        Self {
            id: object.id.0,
            shape_label: object.label,
            frame_id: object.frame.to_string(),
            position: object.position.to_array(),
            orientation: [q.i, q.j, q.k, q.w],
            extent: object.extent,
        }
    }
}

/// Reply to [`GetObjectsRequest`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetObjectsResponse {
    /// Registry snapshot, ordered by label then id.
    pub objects: Vec<ObjectInfo>,
}

impl GetObjectsResponse {
    /// Build from registry entries.
    pub fn from_objects(objects: &[RecognizedObject]) -> Self {
        Self {
            objects: objects.iter().map(ObjectInfo::from).collect(),
        }
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if no objects were returned.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects with a given label.
    pub fn with_label(&self, label: ShapeLabel) -> impl Iterator<Item = &ObjectInfo> {
        self.objects.iter().filter(move |o| o.shape_label == label)
    }
}
