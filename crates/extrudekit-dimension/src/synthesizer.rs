//! Extrusion synthesizer
//!
//! Drives one forward pass over annotated G-code:
//! - the initialization block is echoed while its annotations are read
//! - the island outlines are indexed when retraction is island restricted
//! - every following line is rewritten with its E word, and retraction
//!   moves are inserted at extruder off/on events

use crate::boundary::BoundaryIndex;
use crate::gcode::{
    classify_all, format_rounded, Keyword, ParsedLine, DEFAULT_DECIMAL_PLACES, MAX_DECIMAL_PLACES,
};
use crate::geometry::{FeedLengthAccumulator, GeometryModel, GeometryParameters};
use crate::lookahead::{z_distance_ratio, LookaheadView};
use crate::position::{MotionMode, PositionTracker};
use crate::retraction::{policy_for, RetractionContext, RetractionPolicy};
use extrudekit_core::{Diagnostic, Diagnostics, Result};
use extrudekit_settings::DimensionSettings;
use serde::Serialize;

/// Marker line emitted when the initialization block ends
pub const PROCEDURE_NAME_LINE: &str = "(<procedureName> dimension </procedureName>)";

/// Output of one pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    /// Rewritten G-code
    pub gcode: String,
    /// Anomalies recovered during the pass, in input order
    pub diagnostics: Vec<Diagnostic>,
}

/// Values declared by the initialization block
#[derive(Debug, Clone, Default)]
struct Initialization {
    layer_thickness: f64,
    perimeter_width: f64,
    nozzle_diameter: Option<f64>,
    travel_feed_rate_per_second: Option<f64>,
    maximum_z_feed_rate_per_second: Option<f64>,
    feed_rate_minute: Option<f64>,
    operating_flow_rate: Option<f64>,
    decimal_places: Option<u32>,
}

impl Initialization {
    fn read(&mut self, line: &ParsedLine, index: usize, diagnostics: &mut Diagnostics) {
        if !matches!(
            line.keyword,
            Keyword::LayerThickness
                | Keyword::PerimeterWidth
                | Keyword::NozzleDiameter
                | Keyword::TravelFeedRatePerSecond
                | Keyword::MaximumZTravelFeedRatePerSecond
                | Keyword::OperatingFeedRatePerSecond
                | Keyword::OperatingFlowRate
                | Keyword::DecimalPlacesCarried
        ) {
            return;
        }

        let value = match line.argument(index) {
            Ok(value) => value,
            Err(e) => {
                diagnostics.warn(Some(index), format!("ignored annotation: {}", e));
                return;
            }
        };

        match line.keyword {
            Keyword::LayerThickness => self.layer_thickness = value,
            Keyword::PerimeterWidth => self.perimeter_width = value,
            Keyword::NozzleDiameter => self.nozzle_diameter = Some(value),
            Keyword::TravelFeedRatePerSecond => self.travel_feed_rate_per_second = Some(value),
            Keyword::MaximumZTravelFeedRatePerSecond => {
                self.maximum_z_feed_rate_per_second = Some(value)
            }
            Keyword::OperatingFeedRatePerSecond => self.feed_rate_minute = Some(60.0 * value),
            Keyword::OperatingFlowRate => self.operating_flow_rate = Some(value),
            Keyword::DecimalPlacesCarried => {
                let places = value.round().clamp(0.0, MAX_DECIMAL_PLACES as f64);
                if places != value.round() {
                    diagnostics.warn(
                        Some(index),
                        format!("decimal places {} clamped to {}", value, places),
                    );
                }
                self.decimal_places = Some(places as u32);
            }
            _ => {}
        }
    }
}

/// Extrusion synthesizer configured for one set of settings
#[derive(Debug, Clone)]
pub struct ExtrusionSynthesizer {
    settings: DimensionSettings,
}

impl ExtrusionSynthesizer {
    /// Create a synthesizer, rejecting invalid settings
    pub fn new(settings: DimensionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &DimensionSettings {
        &self.settings
    }

    /// Run a pass over `text`
    ///
    /// Never fails on malformed input; anomalies are reported in
    /// [`Synthesis::diagnostics`].
    pub fn synthesize(&self, text: &str) -> Synthesis {
        if !self.settings.activate_dimension {
            tracing::debug!("Dimension is deactivated, passing text through");
            return Synthesis {
                gcode: text.to_string(),
                diagnostics: Vec::new(),
            };
        }

        let lines = classify_all(text);
        let mut diagnostics = Diagnostics::new();
        let mut init = Initialization::default();
        let mut output = Vec::with_capacity(lines.len() + lines.len() / 4);

        let mut main_start = None;
        for (index, line) in lines.iter().enumerate() {
            if line.keyword == Keyword::ExtruderInitializationEnd {
                output.push(PROCEDURE_NAME_LINE.to_string());
                main_start = Some(index);
                break;
            }
            init.read(line, index, &mut diagnostics);
            output.push(line.raw.clone());
        }

        let Some(main_start) = main_start else {
            diagnostics.info(
                None,
                "no (</extruderInitialization>) marker found, text left unchanged",
            );
            return Synthesis {
                gcode: text.to_string(),
                diagnostics: diagnostics.into_vec(),
            };
        };

        let boundaries = self
            .settings
            .restricts_to_islands()
            .then(|| BoundaryIndex::build(&lines[main_start..]));

        let view = LookaheadView::new(
            &lines,
            boundaries.as_ref(),
            z_distance_ratio(
                init.travel_feed_rate_per_second,
                init.maximum_z_feed_rate_per_second,
            ),
        );

        let mut pass = Pass::new(&self.settings, &init, view, output, diagnostics);
        for (index, line) in lines.iter().enumerate().skip(main_start) {
            pass.process_line(index, line);
        }
        pass.finish()
    }
}

/// Run a single pass with the given settings
pub fn synthesize(text: &str, settings: &DimensionSettings) -> Result<Synthesis> {
    Ok(ExtrusionSynthesizer::new(settings.clone())?.synthesize(text))
}

/// Mutable state of the main phase
struct Pass<'a> {
    settings: &'a DimensionSettings,
    view: LookaheadView<'a>,
    tracker: PositionTracker,
    geometry: GeometryModel,
    accumulator: FeedLengthAccumulator,
    policy: Box<dyn RetractionPolicy>,
    extruder_active: bool,
    layer_index: Option<usize>,
    feed_rate_minute: Option<f64>,
    flow_rate_notice_given: bool,
    output: Vec<String>,
    diagnostics: Diagnostics,
}

impl<'a> Pass<'a> {
    fn new(
        settings: &'a DimensionSettings,
        init: &Initialization,
        view: LookaheadView<'a>,
        output: Vec<String>,
        diagnostics: Diagnostics,
    ) -> Self {
        let params = GeometryParameters {
            layer_thickness: init.layer_thickness,
            perimeter_width: init.perimeter_width,
            nozzle_diameter: init.nozzle_diameter,
            flow_rate: init.operating_flow_rate,
            ..GeometryParameters::from_settings(settings)
        };
        let geometry = GeometryModel::new(params, settings.use_filament_diameter);
        let decimal_places = init.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES);
        let policy = policy_for(settings);

        tracing::debug!(
            "Extrusion geometry: layer thickness {}, perimeter width {}, nozzle {:?}, \
             filament {} (packing density {}), bead area {:.6}, filament area {:.6}, reduction {:.6}",
            params.layer_thickness,
            params.perimeter_width,
            params.nozzle_diameter,
            params.filament_diameter,
            params.filament_packing_density,
            geometry.extrusion_cross_section(),
            geometry.filament_cross_section(),
            geometry.extrusion_reduction()
        );
        tracing::debug!(
            "Retraction policy: {} ({}), z distance ratio {}",
            policy.name(),
            policy.description(),
            view.z_distance_ratio()
        );

        Self {
            settings,
            view,
            tracker: PositionTracker::new(),
            geometry,
            accumulator: FeedLengthAccumulator::new(settings.extrusion_distance_format, decimal_places),
            policy,
            extruder_active: false,
            layer_index: None,
            feed_rate_minute: init.feed_rate_minute,
            flow_rate_notice_given: false,
            output,
            diagnostics,
        }
    }

    fn process_line(&mut self, index: usize, line: &ParsedLine) {
        let mut text = line.raw.trim_start().to_string();

        match &line.keyword {
            Keyword::LinearMove => {
                self.update_feed_rate(line);
                let motion = self.tracker.apply_motion(line);
                if motion.assumed_origin {
                    self.diagnostics.warn(
                        Some(index),
                        "relative move with no known position, origin assumed",
                    );
                }
                text = self.with_extrusion(text, motion.distance, index);
            }
            Keyword::ArcClockwise | Keyword::ArcCounterClockwise => {
                self.update_feed_rate(line);
                if let Some(motion) = self.tracker.apply_arc(line) {
                    text = self.with_extrusion(text, motion.distance, index);
                }
            }
            Keyword::AbsoluteMode => self.tracker.set_mode(MotionMode::Absolute),
            Keyword::RelativeMode => self.tracker.set_mode(MotionMode::Relative),
            Keyword::Layer => {
                self.output
                    .push(self.settings.extrusion_distance_format.mode_command().to_string());
                self.layer_index = Some(self.layer_index.map_or(0, |i| i + 1));
            }
            Keyword::ExtruderOn => {
                let reduction = self.geometry.extrusion_reduction();
                let restart = self.policy.on_activate(reduction);
                if let Some(delta) = restart {
                    self.push_extrusion_move(delta);
                }
                if self.accumulator.total() > self.settings.maximum_e_value_before_reset
                    || self.settings.is_relative()
                {
                    self.output.push("G92 E0".to_string());
                    self.accumulator.reset();
                }
                self.extruder_active = true;
            }
            Keyword::ExtruderOff => {
                self.extruder_active = false;
                let ctx = RetractionContext {
                    view: self.view,
                    line_index: index,
                    tracker: &self.tracker,
                    feed_rate_minute: self.feed_rate_minute,
                    layer_index: self.layer_index,
                    extrusion_reduction: self.geometry.extrusion_reduction(),
                };
                let retract = self.policy.on_deactivate(&ctx, &mut self.diagnostics);
                if let Some(delta) = retract {
                    self.push_extrusion_move(delta);
                }
            }
            Keyword::FlowRate => match line.prefixed_argument(index) {
                Ok(rate) => self.geometry.params.flow_rate = Some(rate),
                Err(e) => self
                    .diagnostics
                    .warn(Some(index), format!("flow rate unchanged: {}", e)),
            },
            _ => {}
        }

        self.output.push(text);
    }

    fn update_feed_rate(&mut self, line: &ParsedLine) {
        if let Some(feed) = line.param('F') {
            self.feed_rate_minute = Some(feed);
        }
    }

    /// Add the E word for a move of `distance` while the extruder is on
    fn with_extrusion(&mut self, text: String, distance: f64, index: usize) -> String {
        if !self.extruder_active || distance == 0.0 {
            return text;
        }
        if distance < 0.0 {
            self.diagnostics.warn(
                Some(index),
                format!("negative travel distance {}, no E value", distance),
            );
            return text;
        }

        let flow_rate = match self.geometry.params.flow_rate {
            Some(rate) => rate,
            None => {
                if !self.flow_rate_notice_given {
                    self.flow_rate_notice_given = true;
                    self.diagnostics.info(
                        Some(index),
                        "no flow rate established, extruding zero length",
                    );
                }
                0.0
            }
        };

        let length = self.geometry.feed_length_for(distance, flow_rate);
        let token = self.accumulator.emit(length);

        match text.find(';') {
            Some(pos) => format!("{} {} {}", text[..pos].trim_end(), token, &text[pos..]),
            None => format!("{} {}", text, token),
        }
    }

    /// Emit a retraction or restart move framed by feed rate changes
    fn push_extrusion_move(&mut self, delta: f64) {
        let speed = self.settings.extruder_retraction_speed;
        if speed == 0.0 {
            return;
        }

        let places = self.accumulator.decimal_places();
        self.output
            .push(format!("G1 F{}", format_rounded(60.0 * speed, places)));
        let token = self.accumulator.emit(delta);
        self.output.push(format!("G1 {}", token));
        if let Some(feed) = self.feed_rate_minute {
            self.output
                .push(format!("G1 F{}", format_rounded(feed, places)));
        }
    }

    fn finish(self) -> Synthesis {
        let mut gcode = self.output.join("\n");
        gcode.push('\n');

        let diagnostics = self.diagnostics.into_vec();
        tracing::info!(
            "Extrusion synthesized: {} output lines, {} diagnostics",
            self.output.len(),
            diagnostics.len()
        );

        Synthesis { gcode, diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
(<extruderInitialization>)
(<layerThickness> 0.4 </layerThickness>)
(<perimeterWidth> 0.5 </perimeterWidth>)
(<operatingFeedRatePerSecond> 10.0 </operatingFeedRatePerSecond>)
(<operatingFlowRate> 1.0 </operatingFlowRate>)
(</extruderInitialization>)
";

    fn run(body: &str, settings: &DimensionSettings) -> Synthesis {
        synthesize(&format!("{}{}", HEADER, body), settings).unwrap()
    }

    #[test]
    fn test_initialization_is_echoed() {
        let result = run("", &DimensionSettings::default());
        let lines: Vec<&str> = result.gcode.lines().collect();
        assert_eq!(lines[0], "(<extruderInitialization>)");
        assert_eq!(lines[5], PROCEDURE_NAME_LINE);
        assert_eq!(lines[6], "(</extruderInitialization>)");
        assert!(result.gcode.ends_with('\n'));
    }

    #[test]
    fn test_deactivated_passes_through() {
        let settings = DimensionSettings {
            activate_dimension: false,
            ..Default::default()
        };
        let text = "G1 X1\nM101\nG1 X2";
        assert_eq!(synthesize(text, &settings).unwrap().gcode, text);
    }

    #[test]
    fn test_missing_initialization_end() {
        let text = "G1 X1\nM101\nG1 X2\n";
        let result = synthesize(text, &DimensionSettings::default()).unwrap();
        assert_eq!(result.gcode, text);
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = DimensionSettings {
            filament_diameter: -1.0,
            ..Default::default()
        };
        assert!(ExtrusionSynthesizer::new(settings).is_err());
    }

    #[test]
    fn test_layer_marker_declares_mode() {
        let result = run("(<layer> 0.4 )\n", &DimensionSettings::default());
        assert!(result.gcode.contains("M82\n(<layer> 0.4 )"));
    }

    #[test]
    fn test_e_word_goes_before_semicolon_comment() {
        let settings = DimensionSettings {
            retraction: extrudekit_settings::RetractionMode::None,
            ..Default::default()
        };
        let result = run("G1 X0 Y0\nM101\nG1 X10 ; perimeter\n", &settings);
        assert!(result.gcode.contains("G1 X10 E0.411 ; perimeter"));
    }

    #[test]
    fn test_bad_flow_rate_is_reported() {
        let result = run("M108 Sfast\n", &DimensionSettings::default());
        assert!(result.diagnostics.iter().any(|d| d.line == Some(6)));
        assert!(result.gcode.contains("M108 Sfast"));
    }
}
