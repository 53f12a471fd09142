use extrudekit::{output_path, process_file, DimensionSettings, RetractionMode};
use std::path::Path;
use tempfile::tempdir;

const INPUT: &str = "\
(<extruderInitialization>)
(<layerThickness> 0.4 </layerThickness>)
(<perimeterWidth> 0.5 </perimeterWidth>)
(<operatingFlowRate> 1.0 </operatingFlowRate>)
(</extruderInitialization>)
(<layer> 0.4 )
G1 X0 Y0
M101
G1 X10 Y0
";

#[test]
fn test_output_path() {
    assert_eq!(
        output_path(Path::new("/tmp/part.gcode")),
        Path::new("/tmp/part_dimension.gcode")
    );
    assert_eq!(output_path(Path::new("cube")), Path::new("cube_dimension.gcode"));
}

#[test]
fn test_process_file_writes_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("cube.gcode");
    std::fs::write(&input, INPUT).unwrap();
    let output = output_path(&input);

    let settings = DimensionSettings {
        retraction: RetractionMode::None,
        ..Default::default()
    };
    let synthesis = process_file(&input, &output, &settings).unwrap();
    assert!(synthesis.diagnostics.is_empty());

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, synthesis.gcode);
    assert!(written.contains("M82\n(<layer> 0.4 )"));
    assert!(written.contains("G1 X10 Y0 E0.411"));
}

#[test]
fn test_missing_input_is_an_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.gcode");
    let output = dir.path().join("out.gcode");
    assert!(process_file(&input, &output, &DimensionSettings::default()).is_err());
    assert!(!output.exists());
}
