//! Retraction policies
//!
//! A policy is chosen once from the settings and consulted at every
//! extruder off/on event. It returns the feed length delta to emit, which
//! the synthesizer routes through the same E-axis accounting as ordinary
//! moves.

use crate::lookahead::{retraction_ratio, LookaheadView};
use crate::position::PositionTracker;
use extrudekit_core::Diagnostics;
use extrudekit_settings::{DimensionSettings, RetractionMode};

/// Scale between the adaptive retract length and feed length units
pub const ADAPTIVE_UNIT_SCALE: f64 = 10.0;

/// State of the pass at an extruder-off event
#[derive(Debug, Clone, Copy)]
pub struct RetractionContext<'a> {
    pub view: LookaheadView<'a>,
    /// Index of the `M103` line
    pub line_index: usize,
    pub tracker: &'a PositionTracker,
    pub feed_rate_minute: Option<f64>,
    pub layer_index: Option<usize>,
    pub extrusion_reduction: f64,
}

impl RetractionContext<'_> {
    fn distance_to_next_thread(&self) -> Option<crate::lookahead::ThreadDistance> {
        self.view.distance_to_next_thread(
            self.line_index,
            self.tracker,
            self.feed_rate_minute,
            self.layer_index,
        )
    }
}

/// Retraction strategy
pub trait RetractionPolicy: Send + Sync {
    /// Get policy name
    fn name(&self) -> &str;

    /// Get policy description
    fn description(&self) -> &str;

    /// Feed length delta to emit when the extruder turns off
    fn on_deactivate(
        &mut self,
        ctx: &RetractionContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<f64>;

    /// Feed length delta to emit when the extruder turns on
    fn on_activate(&mut self, extrusion_reduction: f64) -> Option<f64>;
}

fn non_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

/// Fixed distance scaled by the travel ratio
#[derive(Debug, Clone)]
pub struct FixedRetraction {
    retraction_distance: f64,
    restart_distance: f64,
    minimum_travel: f64,
    ratio: f64,
}

impl FixedRetraction {
    pub fn new(settings: &DimensionSettings) -> Self {
        Self {
            retraction_distance: settings.retraction_distance,
            restart_distance: settings.restart_distance(),
            minimum_travel: settings.minimum_travel_for_retraction,
            ratio: 1.0,
        }
    }

    /// Ratio from the last extruder-off event, 1.0 before the first
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl RetractionPolicy for FixedRetraction {
    fn name(&self) -> &str {
        "fixed"
    }

    fn description(&self) -> &str {
        "Retracts a fixed distance scaled by the travel to the next thread"
    }

    fn on_deactivate(
        &mut self,
        ctx: &RetractionContext<'_>,
        _diagnostics: &mut Diagnostics,
    ) -> Option<f64> {
        let travel = ctx.distance_to_next_thread().map(|t| t.distance);
        self.ratio = retraction_ratio(travel, self.minimum_travel);
        tracing::trace!(
            "Fixed retraction at line {}: travel {:?}, ratio {}",
            ctx.line_index,
            travel,
            self.ratio
        );
        non_zero(-self.retraction_distance * self.ratio)
    }

    fn on_activate(&mut self, _extrusion_reduction: f64) -> Option<f64> {
        non_zero(self.restart_distance * self.ratio)
    }
}

/// Retract length from the predicted ooze over the travel time
///
/// Clamped into `[min_retract, max_retract]`.
pub fn adaptive_retract_length(time: f64, ooze_rate: f64, min_retract: f64, max_retract: f64) -> f64 {
    let length = time.max(0.0).sqrt() * ooze_rate / 60.0;
    length.clamp(min_retract, max_retract)
}

/// Retraction sized from the ooze expected during the travel
#[derive(Debug, Clone)]
pub struct AdaptiveRetraction {
    ooze_rate: f64,
    after_ooze_loss: f64,
    min_retract: f64,
    max_retract: f64,
    pending: Option<f64>,
}

impl AdaptiveRetraction {
    pub fn new(settings: &DimensionSettings) -> Self {
        Self {
            ooze_rate: settings.ooze_rate,
            after_ooze_loss: settings.after_ooze_loss,
            min_retract: settings.min_retract,
            max_retract: settings.max_retract,
            pending: None,
        }
    }

    /// Length retracted at the last extruder-off event, awaiting its restart
    pub fn pending(&self) -> Option<f64> {
        self.pending
    }
}

impl RetractionPolicy for AdaptiveRetraction {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn description(&self) -> &str {
        "Retracts by the ooze predicted from the travel time to the next thread"
    }

    fn on_deactivate(
        &mut self,
        ctx: &RetractionContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<f64> {
        self.pending = None;

        let thread = ctx.distance_to_next_thread()?;
        let Some(time) = thread.time else {
            diagnostics.warn(
                Some(ctx.line_index),
                "no feed rate known for the travel; adaptive retraction skipped",
            );
            return None;
        };

        let length = adaptive_retract_length(time, self.ooze_rate, self.min_retract, self.max_retract);
        self.pending = Some(length);
        tracing::trace!(
            "Adaptive retraction at line {}: time {:.3}s, length {}",
            ctx.line_index,
            time,
            length
        );

        non_zero(-(length * ADAPTIVE_UNIT_SCALE - self.after_ooze_loss) / ctx.extrusion_reduction)
    }

    fn on_activate(&mut self, extrusion_reduction: f64) -> Option<f64> {
        let length = self.pending.take()?;
        non_zero(length * ADAPTIVE_UNIT_SCALE / extrusion_reduction)
    }
}

/// No retraction moves
#[derive(Debug, Clone, Default)]
pub struct NoRetraction;

impl RetractionPolicy for NoRetraction {
    fn name(&self) -> &str {
        "none"
    }

    fn description(&self) -> &str {
        "Never retracts"
    }

    fn on_deactivate(
        &mut self,
        _ctx: &RetractionContext<'_>,
        _diagnostics: &mut Diagnostics,
    ) -> Option<f64> {
        None
    }

    fn on_activate(&mut self, _extrusion_reduction: f64) -> Option<f64> {
        None
    }
}

/// Build the policy selected by the settings
pub fn policy_for(settings: &DimensionSettings) -> Box<dyn RetractionPolicy> {
    match settings.retraction {
        RetractionMode::Fixed => Box::new(FixedRetraction::new(settings)),
        RetractionMode::Adaptive => Box::new(AdaptiveRetraction::new(settings)),
        RetractionMode::None => Box::new(NoRetraction),
    }
}
