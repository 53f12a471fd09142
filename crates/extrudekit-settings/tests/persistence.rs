use extrudekit_settings::{DimensionSettings, ExtrusionDistanceFormat, RetractionMode};
use tempfile::tempdir;

#[test]
fn test_toml_round_trip_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.toml");

    let settings = DimensionSettings {
        retraction: RetractionMode::Adaptive,
        retraction_distance: 1.2,
        extrusion_distance_format: ExtrusionDistanceFormat::Relative,
        ..Default::default()
    };
    settings.save_to_file(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("retraction = \"adaptive\""));
    assert!(content.contains("extrusion_distance_format = \"relative\""));

    let loaded = DimensionSettings::load_from_file(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_json_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.json");
    std::fs::write(&path, r#"{ "filament_diameter": 1.75, "retraction": "none" }"#).unwrap();

    let loaded = DimensionSettings::load_from_file(&path).unwrap();
    assert_eq!(loaded.filament_diameter, 1.75);
    assert_eq!(loaded.retraction, RetractionMode::None);
    assert_eq!(loaded.ooze_rate, 75.0);
    assert!(loaded.activate_dimension);
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.yaml");
    std::fs::write(&path, "filament_diameter: 1.75").unwrap();

    let err = DimensionSettings::load_from_file(&path).unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.toml");
    std::fs::write(&path, "max_retract = 0.1\nmin_retract = 0.5\n").unwrap();

    let err = DimensionSettings::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("max_retract"));
}

#[test]
fn test_nan_retract_limit_is_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.toml");
    std::fs::write(&path, "retraction = \"adaptive\"\nmax_retract = nan\n").unwrap();

    let err = DimensionSettings::load_from_file(&path).unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("max_retract"));
}

#[test]
fn test_corrupted_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dimension.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(DimensionSettings::load_from_file(&path).is_err());
}
