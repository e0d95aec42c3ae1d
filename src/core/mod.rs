//! Foundation types: points, frames, clouds, images, time.
//!
//! No dependencies on other crate modules.

mod cloud;
mod frame;
mod image;
pub mod math;
mod point;
mod time;

pub use cloud::PointCloud;
pub use frame::FrameId;
pub use image::{ColorImage, DepthImage};
pub use point::{Bounds3D, Point3D};
pub use time::{Clock, ManualClock, SystemClock, Timestamped};
