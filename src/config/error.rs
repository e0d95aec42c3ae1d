//! Configuration loading and validation errors.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup; none can occur during a pipeline cycle.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("I/O error reading {path}: {message}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// File contents are not valid TOML for this schema.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A parameter is outside its valid range.
    #[error("Invalid parameter `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending parameter (e.g. `filter.voxel.leaf_size`).
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Require `value > 0` and finite.
pub(crate) fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be a positive finite number (got {})", value),
        ))
    }
}

/// Require `value` finite.
pub(crate) fn ensure_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be finite (got {})", value)))
    }
}

/// Require `min <= value <= max`.
pub(crate) fn ensure_in_range(
    field: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be in [{}, {}] (got {})", min, max, value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid("filter.voxel.leaf_size", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `filter.voxel.leaf_size`: must be positive"
        );
    }

    #[test]
    fn test_range_helpers() {
        assert!(ensure_positive("x", 0.1).is_ok());
        assert!(ensure_positive("x", 0.0).is_err());
        assert!(ensure_positive("x", -1.0).is_err());
        assert!(ensure_positive("x", f32::NAN).is_err());
        assert!(ensure_finite("x", -3.0).is_ok());
        assert!(ensure_finite("x", f32::INFINITY).is_err());
        assert!(ensure_in_range("x", 0.5, 0.0, 1.0).is_ok());
        assert!(ensure_in_range("x", 1.5, 0.0, 1.0).is_err());
    }
}
