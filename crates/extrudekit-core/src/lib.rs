//! # ExtrudeKit Core
//!
//! Core types shared by the ExtrudeKit crates.
//! Provides the error hierarchy and the diagnostic records that the
//! extrusion synthesizer reports alongside its output.

pub mod diagnostics;
pub mod error;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ConfigError, Error, GcodeError, Result};
