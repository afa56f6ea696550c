use mvt_core::config::GROUP_QUADRATURE;
use mvt_core::{AppConfig, Color, ConfigError};
use std::fs;

#[test]
fn load_reads_scene_overrides_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    fs::write(
        &path,
        r#"{
            "logging": { "level": "warn" },
            "scene": {
                "function_definition": "sin(x)",
                "interval": { "start": 0.0, "end": 3.0 },
                "tangent_length": 1.5
            }
        }"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.scene.function_definition, "sin(x)");
    assert_eq!(config.scene.interval.end, 3.0);
    assert_eq!(config.scene.tangent_length, 1.5);
    let quadrature = config
        .scene
        .groups
        .iter()
        .find(|group| group.key == GROUP_QUADRATURE)
        .unwrap();
    assert_eq!(quadrature.color, Color::rgb(0x00, 0xFF, 0x00));
}

#[test]
fn load_reports_missing_file_and_invalid_scene() {
    let dir = tempfile::tempdir().unwrap();
    let missing = AppConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io(_)));

    let path = dir.path().join("inverted.json");
    fs::write(
        &path,
        r#"{ "scene": { "interval": { "start": 2.0, "end": -2.0 } } }"#,
    )
    .unwrap();
    let invalid = AppConfig::load(&path).unwrap_err();
    assert!(matches!(invalid, ConfigError::Invalid(_)));
    assert!(invalid.to_string().contains("interval"));
}

#[test]
fn group_colors_parse_from_hex_strings() {
    let raw = AppConfig::default();
    let json = serde_json::to_string(&raw).unwrap();
    assert!(json.contains("\"#00D8F5\""));

    let parsed = AppConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, raw);
}
