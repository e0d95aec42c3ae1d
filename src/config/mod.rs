//! Configuration loading for Akriti.
//!
//! Loads all settings from a single TOML file. Every section has defaults
//! suited to a tabletop RGB-D scene, so partial files are fine.
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | `[frames]` | Reference and sensor frame names, transform staleness |
//! | `[filter.crop]` / `[filter.voxel]` | Workspace crop box, voxel leaf size |
//! | `[plane]` | Support plane inlier tolerance and consensus |
//! | `[cluster]` | Cluster distance and size limits |
//! | `[fitting]` | Superquadric fitter effort and exponent bounds |
//! | `[classifier]` | Exponent/scale tolerance bands, fit-quality threshold |
//! | `[registry]` | Merge radius and merge strategy |
//! | `[overlay]` | Debug overlay intrinsics |
//!
//! ## Example TOML
//!
//! ```toml
//! start_active = true
//!
//! [frames]
//! reference_frame = "base_link"
//! cloud_frame = "camera_depth_optical_frame"
//! max_transform_age_ms = 500
//!
//! [filter.crop]
//! half_width = 0.5
//! depth = 1.2
//! min_z = -0.05
//! max_z = 0.5
//!
//! [filter.voxel]
//! leaf_size = 0.01
//!
//! [registry.merge]
//! kind = "exponential_smoothing"
//! alpha = 0.5
//! ```
//!
//! Out-of-range values fail at load time with [`ConfigError::Invalid`].

mod akriti;
mod error;
mod frames;

pub use akriti::{AkritiConfig, DEFAULT_CONFIG_PATH};
pub use error::ConfigError;
pub use frames::FramesSection;

pub(crate) use error::{ensure_finite, ensure_in_range, ensure_positive};
