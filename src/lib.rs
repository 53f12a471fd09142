//! # ExtrudeKit
//!
//! Post-processor that adds extrusion (E axis) values and retraction
//! compensation to annotated 3D-printing G-code, so a stepper-driven
//! extruder does not need to infer filament feed from geometry.
//!
//! ## Architecture
//!
//! ExtrudeKit is organized as a workspace with multiple crates:
//!
//! 1. **extrudekit-core** - Error types and diagnostics
//! 2. **extrudekit-settings** - Dimension settings, validation, JSON/TOML files
//! 3. **extrudekit-dimension** - Line classifier, geometry, boundaries, retraction, synthesizer
//! 4. **extrudekit** - Command line binary that integrates all crates

use anyhow::Context;
use std::path::{Path, PathBuf};

pub use extrudekit_core::{Diagnostic, Diagnostics, Error, Result, Severity};
pub use extrudekit_dimension::{synthesize, ExtrusionSynthesizer, Synthesis};
pub use extrudekit_settings::{
    default_config_path, DimensionSettings, ExtrusionDistanceFormat, RetractionMode,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Suffix appended to the input file stem for the output file
pub const OUTPUT_SUFFIX: &str = "_dimension";

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// Logs go to stderr so the G-code can be piped from stdout.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Path of the file written for `input`: `<stem>_dimension.gcode` next to it
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.gcode", stem, OUTPUT_SUFFIX))
}

/// Read `input`, run the synthesizer and write the result to `output`
pub fn process_file(
    input: &Path,
    output: &Path,
    settings: &DimensionSettings,
) -> anyhow::Result<Synthesis> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let synthesis = synthesize(&text, settings)?;

    std::fs::write(output, &synthesis.gcode)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote {}", output.display());

    Ok(synthesis)
}
