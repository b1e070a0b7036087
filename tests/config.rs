//! Configuration file loading

use std::io::Write;
use std::time::Duration;

use sightline::config::load_config_file;
use sightline::detect::Reducer;
use sightline::{Config, Error};

#[test]
fn test_explicit_file_loads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[camera]
device = "stub://desk"
max_consecutive_failures = 5

[detection]
endpoint = "http://detector.local:9000/detect"
window_frames = 8
reducer = "max"

[knowledge]
enabled = false
request_timeout_ms = 750
"#
    )
    .unwrap();

    let fc = load_config_file(Some(file.path())).unwrap();
    let config = Config::resolve(fc, |_| None);

    assert_eq!(config.camera.device, "stub://desk");
    assert_eq!(config.camera.max_consecutive_failures, 5);
    assert_eq!(config.detection.endpoint, "http://detector.local:9000/detect");
    assert_eq!(config.detection.window_frames, 8);
    assert_eq!(config.detection.reducer, Reducer::Max);
    assert_eq!(config.detection.window_duration, Duration::from_secs(3));
    assert!(!config.knowledge.enabled);
    assert_eq!(config.knowledge.request_timeout, Duration::from_millis(750));
    assert!(config.validate().is_ok());
}

#[test]
fn test_explicit_malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[camera\ndevice = ").unwrap();

    assert!(load_config_file(Some(file.path())).is_err());
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_config_file(Some(&dir.path().join("nope.toml"))).is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[camera]\nchannel_capacity = 0").unwrap();

    let fc = load_config_file(Some(file.path())).unwrap();
    let config = Config::resolve(fc, |_| None);
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
fn test_zero_knowledge_timeout_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[knowledge]\nrequest_timeout_ms = 0").unwrap();

    let fc = load_config_file(Some(file.path())).unwrap();
    let config = Config::resolve(fc, |_| None);
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}
