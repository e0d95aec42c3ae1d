//! External surfaces: request/response messages, debug overlay, synthetic scenes.

mod messages;
mod overlay;
pub mod scene;

pub use messages::{
    GetObjectsRequest, GetObjectsResponse, ObjectInfo, SetActiveRequest, SetActiveResponse,
};
pub use overlay::{CameraIntrinsics, OverlayConfig, OverlayRenderer, PixelRect, label_color};
pub use scene::{ObjectSpec, SceneDescription, SensorMount, TableSpec};
