//! Tool position tracking
//!
//! Follows the current tool position through linear and arc moves under
//! the active distance mode (G90/G91) and reports the travel of each move.

use crate::gcode::ParsedLine;
use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Distance mode for motion words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionMode {
    /// G90
    #[default]
    Absolute,
    /// G91
    Relative,
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "G90"),
            Self::Relative => write!(f, "G91"),
        }
    }
}

/// Result of applying one motion line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Position after the move
    pub position: DVec3,
    /// Displacement of the move
    pub delta: DVec3,
    /// Travel length of the move
    pub distance: f64,
    /// Relative move with no prior position; the origin was assumed
    pub assumed_origin: bool,
}

/// Current position and distance mode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionTracker {
    position: Option<DVec3>,
    mode: MotionMode,
}

impl PositionTracker {
    /// Create a tracker with no known position, in absolute mode
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position, `None` until the first motion line
    pub fn position(&self) -> Option<DVec3> {
        self.position
    }

    /// Current distance mode
    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    /// Switch the distance mode
    pub fn set_mode(&mut self, mode: MotionMode) {
        self.mode = mode;
    }

    /// Apply a linear move
    ///
    /// In absolute mode omitted axes keep their prior value and the first
    /// move reports no travel. In relative mode only present axes move.
    pub fn apply_motion(&mut self, line: &ParsedLine) -> Motion {
        let (target, assumed_origin) = self.target(line);
        let old = self.position;
        self.position = Some(target);

        let distance = match (self.mode, old) {
            (MotionMode::Absolute, None) => 0.0,
            (_, Some(old)) => (target - old).length(),
            (MotionMode::Relative, None) => target.length(),
        };

        Motion {
            position: target,
            delta: target - old.unwrap_or(DVec3::ZERO),
            distance,
            assumed_origin,
        }
    }

    /// Apply an arc move (G2/G3)
    ///
    /// Needs a known prior position; without one the position is left
    /// untouched and `None` is returned.
    pub fn apply_arc(&mut self, line: &ParsedLine) -> Option<Motion> {
        let old = self.position?;
        let (target, _) = self.target(line);
        self.position = Some(target);

        let delta = target - old;
        Some(Motion {
            position: target,
            delta,
            distance: arc_distance(delta, line),
            assumed_origin: false,
        })
    }

    fn target(&self, line: &ParsedLine) -> (DVec3, bool) {
        match self.mode {
            MotionMode::Absolute => {
                let base = self.position.unwrap_or(DVec3::ZERO);
                let target = DVec3::new(
                    line.param('X').unwrap_or(base.x),
                    line.param('Y').unwrap_or(base.y),
                    line.param('Z').unwrap_or(base.z),
                );
                (target, false)
            }
            MotionMode::Relative => {
                let delta = DVec3::new(
                    line.param('X').unwrap_or(0.0),
                    line.param('Y').unwrap_or(0.0),
                    line.param('Z').unwrap_or(0.0),
                );
                let base = self.position.unwrap_or(DVec3::ZERO);
                (base + delta, self.position.is_none())
            }
        }
    }
}

/// Length of an arc move with displacement `delta`
///
/// The radius comes from `R`, or from the `I`/`J` center offset. A chord
/// longer than the diameter is stretched proportionally instead of failing
/// the `asin`. A zero radius falls back to the straight-line length.
pub fn arc_distance(delta: DVec3, line: &ParsedLine) -> f64 {
    let radius = match line.param('R') {
        Some(r) => r.abs(),
        None => DVec2::new(line.param('I').unwrap_or(0.0), line.param('J').unwrap_or(0.0)).length(),
    };

    if radius <= f64::EPSILON {
        return delta.length();
    }

    let half_chord = delta.truncate().length() / 2.0;
    let angle = if half_chord < radius {
        2.0 * (half_chord / radius).asin()
    } else {
        PI * half_chord / radius
    };

    DVec2::new(angle * radius, delta.z).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::classify;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_absolute_first_move_has_no_travel() {
        let mut tracker = PositionTracker::new();
        let motion = tracker.apply_motion(&classify("G1 X10 Y0"));
        assert_eq!(motion.distance, 0.0);
        assert_eq!(motion.position, DVec3::new(10.0, 0.0, 0.0));

        let motion = tracker.apply_motion(&classify("G1 Y5"));
        assert_eq!(motion.distance, 5.0);
        assert_eq!(motion.position, DVec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_relative_moves() {
        let mut tracker = PositionTracker::new();
        tracker.apply_motion(&classify("G1 X1 Y1 Z1"));
        tracker.set_mode(MotionMode::Relative);

        let motion = tracker.apply_motion(&classify("G1 X3 Y4"));
        assert_eq!(motion.distance, 5.0);
        assert_eq!(motion.position, DVec3::new(4.0, 5.0, 1.0));
        assert!(!motion.assumed_origin);
    }

    #[test]
    fn test_relative_without_position_assumes_origin() {
        let mut tracker = PositionTracker::new();
        tracker.set_mode(MotionMode::Relative);

        let motion = tracker.apply_motion(&classify("G1 X3 Y4"));
        assert!(motion.assumed_origin);
        assert_eq!(motion.distance, 5.0);
        assert_eq!(tracker.position(), Some(DVec3::new(3.0, 4.0, 0.0)));
    }

    #[test]
    fn test_arc_requires_prior_position() {
        let mut tracker = PositionTracker::new();
        assert!(tracker.apply_arc(&classify("G2 X10 Y0 R5")).is_none());
        assert!(tracker.position().is_none());
    }

    #[test]
    fn test_semicircle_arc() {
        let mut tracker = PositionTracker::new();
        tracker.apply_motion(&classify("G1 X0 Y0"));

        // Chord equal to the diameter: half a circle of radius 5
        let motion = tracker.apply_arc(&classify("G2 X10 Y0 I5 J0")).unwrap();
        assert!(approx_eq(motion.distance, 5.0 * PI));
    }

    #[test]
    fn test_quarter_arc_with_radius() {
        let delta = DVec3::new(5.0, 5.0, 0.0);
        let distance = arc_distance(delta, &classify("G3 X5 Y5 R5"));
        assert!(approx_eq(distance, 5.0 * PI / 2.0));
    }

    #[test]
    fn test_helical_arc_includes_z() {
        let delta = DVec3::new(10.0, 0.0, 3.0);
        let distance = arc_distance(delta, &classify("G2 X10 Z3 R5"));
        assert!(approx_eq(distance, (25.0 * PI * PI + 9.0).sqrt()));
    }

    #[test]
    fn test_zero_radius_uses_chord() {
        let delta = DVec3::new(3.0, 4.0, 0.0);
        assert!(approx_eq(arc_distance(delta, &classify("G2 X3 Y4")), 5.0));
    }
}
