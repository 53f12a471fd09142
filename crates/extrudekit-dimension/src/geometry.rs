//! Geometry model
//!
//! Converts tool travel into filament feed length from the bead and
//! filament cross-sections, and keeps the E-axis accounting for the
//! configured output format.

use crate::gcode::format_rounded;
use extrudekit_settings::{DimensionSettings, ExtrusionDistanceFormat};
use std::f64::consts::PI;

/// Unit scale between the operating flow rate and the feed length
pub const FLOW_RATE_SCALE: f64 = 10.0;

/// Scalars describing the deposited bead and the filament stock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParameters {
    pub layer_thickness: f64,
    pub perimeter_width: f64,
    pub nozzle_diameter: Option<f64>,
    pub filament_diameter: f64,
    pub filament_packing_density: f64,
    /// Current flow rate, `None` until one is declared
    pub flow_rate: Option<f64>,
}

impl GeometryParameters {
    /// Parameters with the filament taken from the settings and no bead yet
    pub fn from_settings(settings: &DimensionSettings) -> Self {
        Self {
            layer_thickness: 0.0,
            perimeter_width: 0.0,
            nozzle_diameter: None,
            filament_diameter: settings.filament_diameter,
            filament_packing_density: settings.filament_packing_density,
            flow_rate: None,
        }
    }
}

/// Cross-section model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryModel {
    pub params: GeometryParameters,
    use_filament_diameter: bool,
}

impl GeometryModel {
    pub fn new(params: GeometryParameters, use_filament_diameter: bool) -> Self {
        Self {
            params,
            use_filament_diameter,
        }
    }

    /// Area of the deposited bead
    pub fn extrusion_cross_section(&self) -> f64 {
        let radius = (self.params.layer_thickness + self.params.perimeter_width) / 4.0;
        PI * radius * radius
    }

    /// Area of the filament stock
    pub fn filament_cross_section(&self) -> f64 {
        let radius = self.params.filament_diameter / 2.0;
        PI * radius * radius
    }

    /// Area of the nozzle bore, when the nozzle diameter is known
    pub fn nozzle_cross_section(&self) -> Option<f64> {
        self.params
            .nozzle_diameter
            .map(|d| PI * (d / 2.0) * (d / 2.0))
    }

    /// Filament to bead area ratio, or 1.0 when filament scaling is off
    ///
    /// Also 1.0 while the bead area is still zero.
    pub fn extrusion_reduction(&self) -> f64 {
        let bead = self.extrusion_cross_section();
        if !self.use_filament_diameter || bead <= 0.0 {
            return 1.0;
        }
        self.filament_cross_section() / bead
    }

    /// Feed length for a travel distance at a flow rate
    ///
    /// Non-positive distances feed nothing.
    pub fn feed_length_for(&self, distance: f64, flow_rate: f64) -> f64 {
        if distance <= 0.0 {
            return 0.0;
        }
        flow_rate * FLOW_RATE_SCALE * self.extrusion_cross_section() * distance
            / self.extrusion_reduction()
    }
}

/// E-axis accounting for absolute or relative output
#[derive(Debug, Clone, PartialEq)]
pub struct FeedLengthAccumulator {
    format: ExtrusionDistanceFormat,
    total: f64,
    decimal_places: u32,
}

impl FeedLengthAccumulator {
    pub fn new(format: ExtrusionDistanceFormat, decimal_places: u32) -> Self {
        Self {
            format,
            total: 0.0,
            decimal_places,
        }
    }

    pub fn set_decimal_places(&mut self, places: u32) {
        self.decimal_places = places;
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    /// Running total, only advanced in absolute format
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
    }

    /// Account for a length and render its `E` word
    pub fn emit(&mut self, length: f64) -> String {
        let value = match self.format {
            ExtrusionDistanceFormat::Relative => length,
            ExtrusionDistanceFormat::Absolute => {
                self.total += length;
                self.total
            }
        };
        format!("E{}", format_rounded(value, self.decimal_places))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked_model() -> GeometryModel {
        let params = GeometryParameters {
            layer_thickness: 0.4,
            perimeter_width: 0.5,
            nozzle_diameter: Some(0.5),
            filament_diameter: 2.8,
            filament_packing_density: 0.85,
            flow_rate: Some(1.0),
        };
        GeometryModel::new(params, true)
    }

    #[test]
    fn test_cross_sections() {
        let model = worked_model();
        assert!((model.extrusion_cross_section() - 0.159043).abs() < 1e-6);
        assert!((model.filament_cross_section() - 6.157522).abs() < 1e-6);
        assert!((model.extrusion_reduction() - 38.71605).abs() < 1e-4);
        assert!((model.nozzle_cross_section().unwrap() - 0.196350).abs() < 1e-6);
    }

    #[test]
    fn test_feed_length() {
        let model = worked_model();
        let length = model.feed_length_for(10.0, 1.0);
        assert!((length - 0.410794).abs() < 1e-6);
        assert_eq!(model.feed_length_for(0.0, 1.0), 0.0);
        assert_eq!(model.feed_length_for(-1.0, 1.0), 0.0);
    }

    #[test]
    fn test_filament_scaling_off() {
        let mut model = worked_model();
        model.use_filament_diameter = false;
        assert_eq!(model.extrusion_reduction(), 1.0);
        let length = model.feed_length_for(1.0, 1.0);
        assert!((length - 10.0 * model.extrusion_cross_section()).abs() < 1e-12);
    }

    #[test]
    fn test_absolute_accumulation() {
        let mut acc = FeedLengthAccumulator::new(ExtrusionDistanceFormat::Absolute, 3);
        assert_eq!(acc.emit(0.5), "E0.5");
        assert_eq!(acc.emit(0.25), "E0.75");
        assert_eq!(acc.total(), 0.75);
        acc.reset();
        assert_eq!(acc.emit(0.1), "E0.1");
    }

    #[test]
    fn test_relative_emits_each_length() {
        let mut acc = FeedLengthAccumulator::new(ExtrusionDistanceFormat::Relative, 3);
        assert_eq!(acc.emit(0.5), "E0.5");
        assert_eq!(acc.emit(0.5), "E0.5");
        assert_eq!(acc.total(), 0.0);
    }
}
