//! Error types for Akriti

use crate::config::ConfigError;
use crate::engine::CycleError;
use crate::registry::RegistryError;
use crate::transform::TransformError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Akriti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration could not be loaded or is out of range
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Frame transform missing, stale or mismatched
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Registry refused a write
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Pipeline cycle aborted
    #[error("Cycle aborted: {0}")]
    Cycle(#[from] CycleError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FrameId;

    #[test]
    fn test_conversions() {
        let err: Error = ConfigError::invalid("filter.voxel.leaf_size", "negative").into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("filter.voxel.leaf_size"));

        let err: Error = TransformError::Unavailable {
            source_frame: FrameId::new("camera"),
            target_frame: FrameId::new("base_link"),
        }
        .into();
        assert!(err.to_string().contains("camera"));
    }
}
