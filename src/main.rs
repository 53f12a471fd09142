use anyhow::Result;
use clap::Parser;
use extrudekit::{
    default_config_path, init_logging, output_path, process_file, DimensionSettings,
    ExtrusionDistanceFormat, RetractionMode, Severity, BUILD_DATE, VERSION,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extrudekit")]
#[command(about = "Add extrusion values and retraction moves to annotated G-code", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Input G-code file
    input: PathBuf,

    /// Output file (default: <stem>_dimension.gcode next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (.toml or .json); defaults to the user config file when present
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Retraction strategy: fixed, adaptive or none
    #[arg(long)]
    retraction: Option<RetractionMode>,

    /// Extrusion output: absolute or relative
    #[arg(long)]
    extrusion_format: Option<ExtrusionDistanceFormat>,

    /// Filament diameter in millimeters
    #[arg(long)]
    filament_diameter: Option<f64>,

    /// Fixed retraction distance in millimeters
    #[arg(long)]
    retraction_distance: Option<f64>,

    /// Retract on every travel, not only on travels that leave an island
    #[arg(long)]
    retract_within_island: bool,

    /// Write the diagnostics as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn load_settings(&self) -> Result<DimensionSettings> {
        let path = match &self.settings {
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let mut settings = match path {
            Some(path) => {
                tracing::info!("Using settings from {}", path.display());
                DimensionSettings::load_from_file(&path)?
            }
            None => DimensionSettings::default(),
        };

        if let Some(mode) = self.retraction {
            settings.retraction = mode;
        }
        if let Some(format) = self.extrusion_format {
            settings.extrusion_distance_format = format;
        }
        if let Some(diameter) = self.filament_diameter {
            settings.filament_diameter = diameter;
        }
        if let Some(distance) = self.retraction_distance {
            settings.retraction_distance = distance;
        }
        if self.retract_within_island {
            settings.retract_within_island = true;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;
    tracing::debug!("extrudekit {} (built {})", VERSION, BUILD_DATE);

    let settings = cli.load_settings()?;
    let output = cli.output.clone().unwrap_or_else(|| output_path(&cli.input));

    let synthesis = process_file(&cli.input, &output, &settings)?;

    let warnings = synthesis
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    if warnings > 0 {
        tracing::warn!("{} warnings while processing {}", warnings, cli.input.display());
    }

    if let Some(report) = &cli.report {
        let json = serde_json::to_string_pretty(&synthesis.diagnostics)?;
        std::fs::write(report, json)?;
    }

    Ok(())
}
