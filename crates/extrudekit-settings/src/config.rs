//! Dimension configuration
//!
//! Provides the settings consumed by the extrusion synthesizer, their
//! validation, and file handling. Supports JSON and TOML file formats.
//!
//! Settings are organized the way they are presented to users:
//! - Filament (diameter, packing density)
//! - Retraction (mode, fixed distances, adaptive ooze model)
//! - When to retract (island restriction, minimum travel)
//! - Firmware output (E format, reset ceiling)

use extrudekit_core::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Whether emitted E values are cumulative totals or per-move deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrusionDistanceFormat {
    /// Total extrusion distance up to the line (M82)
    #[default]
    Absolute,
    /// Extrusion distance since the previous line (M83)
    Relative,
}

impl ExtrusionDistanceFormat {
    /// Firmware command that declares this mode
    pub fn mode_command(&self) -> &'static str {
        match self {
            Self::Absolute => "M82",
            Self::Relative => "M83",
        }
    }
}

impl fmt::Display for ExtrusionDistanceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

impl FromStr for ExtrusionDistanceFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "absolute" | "abs" => Ok(Self::Absolute),
            "relative" | "rel" => Ok(Self::Relative),
            _ => Err(format!("Unknown extrusion distance format: {}", s)),
        }
    }
}

/// Retraction strategy applied at extruder on/off events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetractionMode {
    /// Fixed retraction distance scaled by the travel ratio
    #[default]
    Fixed,
    /// Retraction sized from the predicted ooze during travel
    Adaptive,
    /// No retraction moves
    None,
}

impl RetractionMode {
    /// Resolve the mode from the two legacy checkboxes.
    ///
    /// Fixed takes precedence when both are set.
    pub fn from_flags(fixed: bool, adaptive: bool) -> Self {
        if fixed {
            Self::Fixed
        } else if adaptive {
            Self::Adaptive
        } else {
            Self::None
        }
    }
}

impl fmt::Display for RetractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Adaptive => write!(f, "adaptive"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for RetractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "adaptive" => Ok(Self::Adaptive),
            "none" | "off" => Ok(Self::None),
            _ => Err(format!("Unknown retraction mode: {}", s)),
        }
    }
}

/// Complete dimension configuration
///
/// Supplied wholesale before a synthesis pass begins. Lengths are in
/// millimeters, speeds in mm/s unless noted otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionSettings {
    /// Run the synthesizer at all; when false the text passes through
    pub activate_dimension: bool,
    /// Filament diameter
    pub filament_diameter: f64,
    /// Effective filament packing density (E-steps corrector)
    pub filament_packing_density: f64,
    /// Extruder feed rate used for retraction moves
    pub extruder_retraction_speed: f64,
    /// Retraction strategy
    pub retraction: RetractionMode,
    /// Fixed retraction distance
    pub retraction_distance: f64,
    /// Extra distance added to the restart
    pub restart_extra_distance: f64,
    /// Retract even when the next thread is inside the same island
    pub retract_within_island: bool,
    /// Travel below which no retraction happens (ramped up to twice this value)
    pub minimum_travel_for_retraction: f64,
    /// Passive ooze rate in mm/min (adaptive mode)
    pub ooze_rate: f64,
    /// Filament lost after the ooze, subtracted from the adaptive retraction
    pub after_ooze_loss: f64,
    /// Upper clamp of the adaptive retraction length
    pub max_retract: f64,
    /// Lower clamp of the adaptive retraction length
    pub min_retract: f64,
    /// Scale E values by the filament to bead cross-section ratio
    pub use_filament_diameter: bool,
    /// Cumulative E value after which a `G92 E0` reset is emitted
    pub maximum_e_value_before_reset: f64,
    /// Absolute or relative E output
    pub extrusion_distance_format: ExtrusionDistanceFormat,
}

impl Default for DimensionSettings {
    fn default() -> Self {
        Self {
            activate_dimension: true,
            filament_diameter: 2.8,
            filament_packing_density: 1.0,
            extruder_retraction_speed: 13.3,
            retraction: RetractionMode::Fixed,
            retraction_distance: 0.0,
            restart_extra_distance: 0.0,
            retract_within_island: false,
            minimum_travel_for_retraction: 1.0,
            ooze_rate: 75.0,
            after_ooze_loss: 1.0,
            max_retract: 20.0,
            min_retract: 0.3,
            use_filament_diameter: true,
            maximum_e_value_before_reset: 91234.0,
            extrusion_distance_format: ExtrusionDistanceFormat::Absolute,
        }
    }
}

impl DimensionSettings {
    /// Create new settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether E output is relative
    pub fn is_relative(&self) -> bool {
        self.extrusion_distance_format == ExtrusionDistanceFormat::Relative
    }

    /// Restart distance of the fixed policy before the travel ratio applies
    pub fn restart_distance(&self) -> f64 {
        self.retraction_distance + self.restart_extra_distance
    }

    /// Whether the boundary index is needed for this configuration
    pub fn restricts_to_islands(&self) -> bool {
        !self.retract_within_island
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let settings: Self = match file_format(path)? {
            FileFormat::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::Corrupted(format!("Invalid JSON settings: {}", e)))?,
            FileFormat::Toml => toml::from_str(&content)
                .map_err(|e| ConfigError::Corrupted(format!("Invalid TOML settings: {}", e)))?,
        };

        settings.validate()?;
        tracing::debug!("Loaded dimension settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match file_format(path)? {
            FileFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize settings: {}", e)))?,
            FileFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize settings: {}", e)))?,
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("filament_diameter", self.filament_diameter),
            ("filament_packing_density", self.filament_packing_density),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(key, format!("must be > 0, got {}", value)).into());
            }
        }

        let non_negative = [
            ("extruder_retraction_speed", self.extruder_retraction_speed),
            ("retraction_distance", self.retraction_distance),
            ("restart_extra_distance", self.restart_extra_distance),
            ("minimum_travel_for_retraction", self.minimum_travel_for_retraction),
            ("ooze_rate", self.ooze_rate),
            ("after_ooze_loss", self.after_ooze_loss),
            ("min_retract", self.min_retract),
            ("max_retract", self.max_retract),
            ("maximum_e_value_before_reset", self.maximum_e_value_before_reset),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(key, format!("must be >= 0, got {}", value)).into());
            }
        }

        if self.max_retract < self.min_retract {
            return Err(ConfigError::invalid(
                "max_retract",
                format!(
                    "must be >= min_retract ({} < {})",
                    self.max_retract, self.min_retract
                ),
            )
            .into());
        }

        Ok(())
    }
}

enum FileFormat {
    Json,
    Toml,
}

fn file_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(FileFormat::Json),
        Some("toml") => Ok(FileFormat::Toml),
        other => Err(ConfigError::UnsupportedFormat(format!(
            "settings file must be .json or .toml, got {:?}",
            other.unwrap_or("")
        ))
        .into()),
    }
}

/// Platform-specific default location of the settings file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("extrudekit").join("dimension.toml"))
}
