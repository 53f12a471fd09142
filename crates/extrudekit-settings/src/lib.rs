//! ExtrudeKit Settings Crate
//!
//! Handles the dimension configuration surface: defaults, validation and
//! JSON/TOML persistence.

pub mod config;

pub use config::{default_config_path, DimensionSettings, ExtrusionDistanceFormat, RetractionMode};
