//! Error handling for ExtrudeKit
//!
//! Provides error types for the layers of the toolkit:
//! - G-Code errors (parameter parsing inside a single line)
//! - Configuration errors (settings validation and file formats)
//!
//! All error types use `thiserror` for ergonomic error handling.
//! The synthesizer itself never fails on malformed input; these errors
//! surface either as diagnostics or at the configuration boundary.

use thiserror::Error;

/// G-Code error type
///
/// Represents errors found while interpreting the words of a G-Code line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Invalid parameter value
    #[error("Invalid parameter '{param}' at line {line_number}: {reason}")]
    InvalidParameter {
        /// The line number (0-based) where the invalid parameter was found.
        line_number: usize,
        /// The parameter word.
        param: String,
        /// The reason the parameter is invalid.
        reason: String,
    },

    /// Missing required parameter
    #[error("Missing required parameter '{param}' at line {line_number}")]
    MissingParameter {
        /// The line number (0-based) where the parameter was missing.
        line_number: usize,
        /// The name of the missing parameter.
        param: String,
    },

    /// Generic G-Code error
    #[error("G-Code error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The setting name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The configuration file is corrupted or malformed.
    #[error("Corrupted configuration: {0}")]
    Corrupted(String),
}

impl ConfigError {
    /// Shorthand for an [`ConfigError::InvalidSetting`].
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Main error type for ExtrudeKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display() {
        let err = GcodeError::InvalidParameter {
            line_number: 12,
            param: "Sabc".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'Sabc' at line 12: not a number"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("filament_diameter", "must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid setting 'filament_diameter': must be > 0"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ConfigError::UnsupportedFormat("yaml".to_string()).into();
        assert!(err.is_config_error());
        assert!(!err.is_gcode_error());

        let err: Error = GcodeError::Other {
            message: "bad".to_string(),
        }
        .into();
        assert!(err.is_gcode_error());
        assert_eq!(err.to_string(), "G-Code error: bad");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(Error::other("plain").to_string(), "plain");
    }
}
