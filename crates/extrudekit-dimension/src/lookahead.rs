//! Lookahead to the next extruder activation
//!
//! A read-only replay of the lines that follow an extruder-off event. The
//! view borrows the immutable line sequence and works on a copy of the
//! position tracker, so it can be called at any point of the main pass.

use crate::boundary::BoundaryIndex;
use crate::gcode::{Keyword, ParsedLine};
use crate::position::{arc_distance, MotionMode, PositionTracker};
use glam::DVec3;

/// Z distance weight used when the feed rates are not declared
pub const DEFAULT_Z_DISTANCE_RATIO: f64 = 5.0;

/// Travel until the next extruder activation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadDistance {
    /// Travel with Z weighted by the Z distance ratio
    pub distance: f64,
    /// Travel time in seconds, `None` when a feed rate was unknown
    pub time: Option<f64>,
}

/// Weight of Z travel relative to XY travel
pub fn z_distance_ratio(travel_feed_rate: Option<f64>, maximum_z_feed_rate: Option<f64>) -> f64 {
    match (travel_feed_rate, maximum_z_feed_rate) {
        (Some(travel), Some(max_z)) if travel > 0.0 && max_z > 0.0 => travel / max_z,
        _ => DEFAULT_Z_DISTANCE_RATIO,
    }
}

/// Share of the fixed retraction to apply for a travel distance
///
/// Full retraction past twice the minimum travel, none up to the minimum,
/// and a linear ramp in between. Unknown travel retracts fully.
pub fn retraction_ratio(distance: Option<f64>, minimum_travel: f64) -> f64 {
    let Some(distance) = distance else {
        return 1.0;
    };
    if distance >= 2.0 * minimum_travel {
        return 1.0;
    }
    if distance <= minimum_travel {
        return 0.0;
    }
    (distance - minimum_travel) / minimum_travel
}

/// Read-only view over the line sequence
#[derive(Debug, Clone, Copy)]
pub struct LookaheadView<'a> {
    lines: &'a [ParsedLine],
    boundaries: Option<&'a BoundaryIndex>,
    z_distance_ratio: f64,
}

impl<'a> LookaheadView<'a> {
    /// Create a view; `boundaries` enables island restriction
    pub fn new(
        lines: &'a [ParsedLine],
        boundaries: Option<&'a BoundaryIndex>,
        z_distance_ratio: f64,
    ) -> Self {
        Self {
            lines,
            boundaries,
            z_distance_ratio,
        }
    }

    pub fn z_distance_ratio(&self) -> f64 {
        self.z_distance_ratio
    }

    /// Travel from the current position to the next `M101` after `line_index`
    ///
    /// Returns `None` when there is no known start position, no further
    /// activation, or, with island restriction, as soon as a replayed
    /// position lies in a different island than the start.
    pub fn distance_to_next_thread(
        &self,
        line_index: usize,
        tracker: &PositionTracker,
        feed_rate_minute: Option<f64>,
        layer_index: Option<usize>,
    ) -> Option<ThreadDistance> {
        let start = tracker.position()?;
        let start_island = self
            .boundaries
            .map(|b| b.smallest_enclosing_loop(layer_index, start.truncate()));

        let mut tracker = *tracker;
        let mut feed_rate = feed_rate_minute;
        let mut distance = 0.0;
        let mut time = Some(0.0);

        for line in self.lines.iter().skip(line_index + 1) {
            let motion = match line.keyword {
                Keyword::LinearMove => {
                    feed_rate = line.param('F').or(feed_rate);
                    let motion = tracker.apply_motion(line);
                    Some((motion.position, self.weighted(motion.delta, motion.delta.truncate().length())))
                }
                Keyword::ArcClockwise | Keyword::ArcCounterClockwise => {
                    feed_rate = line.param('F').or(feed_rate);
                    tracker.apply_arc(line).map(|motion| {
                        let planar = arc_distance(motion.delta.truncate().extend(0.0), line);
                        (motion.position, self.weighted(motion.delta, planar))
                    })
                }
                Keyword::AbsoluteMode => {
                    tracker.set_mode(MotionMode::Absolute);
                    None
                }
                Keyword::RelativeMode => {
                    tracker.set_mode(MotionMode::Relative);
                    None
                }
                Keyword::ExtruderOn => return Some(ThreadDistance { distance, time }),
                _ => None,
            };

            let Some((position, segment)) = motion else {
                continue;
            };

            if let (Some(boundaries), Some(start_island)) = (self.boundaries, start_island) {
                if boundaries.smallest_enclosing_loop(layer_index, position.truncate()) != start_island {
                    tracing::trace!("Lookahead left the starting island at {:?}", position);
                    return None;
                }
            }

            distance += segment;
            time = match (time, feed_rate) {
                (Some(t), Some(f)) if f > 0.0 => Some(t + segment / f * 60.0),
                _ => None,
            };
        }

        None
    }

    fn weighted(&self, delta: DVec3, planar: f64) -> f64 {
        let z = delta.z * self.z_distance_ratio;
        (planar * planar + z * z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::classify_all;

    fn tracker_at(x: f64, y: f64) -> PositionTracker {
        let mut tracker = PositionTracker::new();
        tracker.apply_motion(&crate::gcode::classify(&format!("G1 X{} Y{}", x, y)));
        tracker
    }

    #[test]
    fn test_ratio_ramp() {
        assert_eq!(retraction_ratio(None, 1.0), 1.0);
        assert_eq!(retraction_ratio(Some(2.0), 1.0), 1.0);
        assert_eq!(retraction_ratio(Some(5.0), 1.0), 1.0);
        assert_eq!(retraction_ratio(Some(1.0), 1.0), 0.0);
        assert_eq!(retraction_ratio(Some(0.2), 1.0), 0.0);
        assert_eq!(retraction_ratio(Some(1.5), 1.0), 0.5);
    }

    #[test]
    fn test_zero_minimum_always_retracts() {
        assert_eq!(retraction_ratio(Some(0.0), 0.0), 1.0);
    }

    #[test]
    fn test_z_distance_ratio() {
        assert_eq!(z_distance_ratio(Some(30.0), Some(10.0)), 3.0);
        assert_eq!(z_distance_ratio(None, Some(10.0)), DEFAULT_Z_DISTANCE_RATIO);
        assert_eq!(z_distance_ratio(Some(30.0), Some(0.0)), DEFAULT_Z_DISTANCE_RATIO);
    }

    #[test]
    fn test_distance_and_time() {
        let lines = classify_all("M103\nG1 X3 Y4 F600\nG1 X3 Y10\nM101\nG1 X20");
        let view = LookaheadView::new(&lines, None, 5.0);
        let result = view
            .distance_to_next_thread(0, &tracker_at(0.0, 0.0), Some(1200.0), Some(0))
            .unwrap();
        assert!((result.distance - 11.0).abs() < 1e-9);
        assert!((result.time.unwrap() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_z_travel_is_weighted() {
        let lines = classify_all("M103\nG1 Z1\nM101");
        let view = LookaheadView::new(&lines, None, 5.0);
        let result = view
            .distance_to_next_thread(0, &tracker_at(0.0, 0.0), None, None)
            .unwrap();
        assert_eq!(result.distance, 5.0);
        assert_eq!(result.time, None);
    }

    #[test]
    fn test_exhaustion_and_missing_position() {
        let lines = classify_all("M103\nG1 X10");
        let view = LookaheadView::new(&lines, None, 5.0);
        assert!(view
            .distance_to_next_thread(0, &tracker_at(0.0, 0.0), Some(600.0), None)
            .is_none());

        let lines = classify_all("M103\nM101");
        let view = LookaheadView::new(&lines, None, 5.0);
        assert!(view
            .distance_to_next_thread(0, &PositionTracker::new(), Some(600.0), None)
            .is_none());
    }

    #[test]
    fn test_relative_replay() {
        let lines = classify_all("M103\nG91\nG1 X2\nG1 X2\nM101");
        let view = LookaheadView::new(&lines, None, 5.0);
        let result = view
            .distance_to_next_thread(0, &tracker_at(0.0, 0.0), Some(600.0), None)
            .unwrap();
        assert_eq!(result.distance, 4.0);
    }

    #[test]
    fn test_island_crossing_aborts() {
        let text = "\
(<layer> 0.4 )
(<boundaryPoint> X0.0 Y0.0 </boundaryPoint>)
(<boundaryPoint> X10.0 Y0.0 </boundaryPoint>)
(<boundaryPoint> X10.0 Y10.0 </boundaryPoint>)
(<boundaryPoint> X0.0 Y10.0 </boundaryPoint>)
(</boundaryPerimeter>)";
        let index = BoundaryIndex::build(&classify_all(text));

        let lines = classify_all("M103\nG1 X8 Y8\nM101");
        let view = LookaheadView::new(&lines, Some(&index), 5.0);
        let inside = view.distance_to_next_thread(0, &tracker_at(2.0, 2.0), Some(600.0), Some(0));
        assert!(inside.is_some());

        let lines = classify_all("M103\nG1 X20 Y8\nG1 X8 Y8\nM101");
        let view = LookaheadView::new(&lines, Some(&index), 5.0);
        let crossing = view.distance_to_next_thread(0, &tracker_at(2.0, 2.0), Some(600.0), Some(0));
        assert!(crossing.is_none());
    }
}
