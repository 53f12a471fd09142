//! # ExtrudeKit Dimension
//!
//! Adds extrusion (E axis) values and retraction moves to annotated
//! 3D-printing G-code. Includes the line classifier, position tracking,
//! cross-section geometry, island boundaries, lookahead, retraction
//! policies and the synthesizer that drives them.

pub mod boundary;
pub mod gcode;
pub mod geometry;
pub mod lookahead;
pub mod position;
pub mod retraction;
pub mod synthesizer;

pub use boundary::{BoundaryIndex, BoundaryLayer, BoundaryLoop};
pub use gcode::{classify, classify_all, format_rounded, Keyword, Param, ParsedLine};
pub use geometry::{FeedLengthAccumulator, GeometryModel, GeometryParameters, FLOW_RATE_SCALE};
pub use lookahead::{retraction_ratio, z_distance_ratio, LookaheadView, ThreadDistance};
pub use position::{arc_distance, Motion, MotionMode, PositionTracker};
pub use retraction::{
    adaptive_retract_length, policy_for, AdaptiveRetraction, FixedRetraction, NoRetraction,
    RetractionContext, RetractionPolicy,
};
pub use synthesizer::{synthesize, ExtrusionSynthesizer, Synthesis};
