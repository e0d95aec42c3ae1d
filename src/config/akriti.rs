//! Top-level configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::frames::FramesSection;
use crate::classification::{ClassifierConfig, FitterConfig};
use crate::io::OverlayConfig;
use crate::preprocessing::FilterConfig;
use crate::registry::RegistryConfig;
use crate::segmentation::{ClusterConfig, PlaneConfig};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "configs/akriti.toml";

/// Full shape-recognition configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AkritiConfig {
    /// Start with the pipeline enabled.
    #[serde(default = "default_start_active")]
    pub start_active: bool,

    /// Frame names and staleness bound.
    #[serde(default)]
    pub frames: FramesSection,

    /// Crop box and voxel grid.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Support plane removal.
    #[serde(default)]
    pub plane: PlaneConfig,

    /// Euclidean clustering.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Superquadric fitting.
    #[serde(default)]
    pub fitting: FitterConfig,

    /// Classification bands and fit-quality threshold.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Deduplication.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Debug overlay.
    #[serde(default)]
    pub overlay: OverlayConfig,
}

fn default_start_active() -> bool {
    true
}

impl Default for AkritiConfig {
    fn default() -> Self {
        Self {
            start_active: default_start_active(),
            frames: FramesSection::default(),
            filter: FilterConfig::default(),
            plane: PlaneConfig::default(),
            cluster: ClusterConfig::default(),
            fitting: FitterConfig::default(),
            classifier: ClassifierConfig::default(),
            registry: RegistryConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl AkritiConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load from [`DEFAULT_CONFIG_PATH`], or defaults if the file is absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.frames.validate()?;
        self.filter.validate()?;
        self.plane.validate()?;
        self.cluster.validate()?;
        self.fitting.validate()?;
        self.classifier.validate()?;
        self.registry.validate()?;
        self.overlay.validate()?;

        if self.cluster.tolerance <= self.filter.voxel.leaf_size {
            return Err(ConfigError::invalid(
                "cluster.tolerance",
                format!(
                    "must exceed filter.voxel.leaf_size ({} <= {})",
                    self.cluster.tolerance, self.filter.voxel.leaf_size
                ),
            ));
        }
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
