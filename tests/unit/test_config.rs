//! Unit tests for configuration loading

use patternflow::config::Config;
use patternflow::errors::{get_exit_code, ConfigError, PatternflowError, EXIT_CONFIG_ERROR};
use patternflow::layout::LayoutDirection;
use patternflow::sequencer::PlaybackMode;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
        [playback]
        mode = "step"
        speed_factor = 1.5
        base_delay_ms = 400

        [layout]
        cache_ttl_ms = 1000

        [layout.options]
        direction = "left-right"
        node_spacing = 120.0

        [ui]
        color = false
        "#,
    );

    let config = Config::load(file.path().to_str()).unwrap();
    assert_eq!(config.playback.mode, PlaybackMode::StepByStep);
    assert!((config.playback.speed_factor - 1.5).abs() < f64::EPSILON);
    assert_eq!(config.playback.base_delay_ms, 400);
    assert_eq!(config.layout.cache_ttl_ms, 1000);
    assert_eq!(config.layout.options.direction, LayoutDirection::LeftRight);
    assert!((config.layout.options.node_spacing - 120.0).abs() < f64::EPSILON);
    assert!(!config.ui.color);
}

#[test]
fn test_empty_file_is_all_defaults() {
    let file = write_config("");
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.playback.mode, PlaybackMode::Auto);
    assert_eq!(config.layout.cache_capacity, 64);
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let file = write_config("[playback\nmode = ");
    let err = Config::from_file(file.path()).unwrap_err();
    assert!(matches!(err, PatternflowError::Config(ConfigError::Parse { .. })));
}

#[test]
fn test_invalid_value_maps_to_config_exit_code() {
    let file = write_config("[playback]\nspeed_factor = -1.0\n");
    let err = Config::from_file(file.path())
        .and_then(|c| c.validate())
        .unwrap_err();
    let err: anyhow::Error = err.into();
    assert_eq!(get_exit_code(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_zero_cache_capacity_rejected() {
    let file = write_config("[layout]\ncache_capacity = 0\n");
    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_err());
}
