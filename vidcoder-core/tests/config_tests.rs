// vidcoder-core/tests/config_tests.rs
//
// Loading EncodingConfig from JSON files.

use std::fs;
use std::path::Path;

use vidcoder_core::{CoreError, EncodingConfig};

#[test]
fn test_partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vidcoder.json");
    fs::write(
        &path,
        r#"{ "video_codec": "libx265", "crf": 28, "output_suffix": "_small" }"#,
    )
    .unwrap();

    let config = EncodingConfig::from_json_file(&path).unwrap();
    assert_eq!(config.video_codec, "libx265");
    assert_eq!(config.crf, 28);
    assert_eq!(config.audio_codec, "aac");
    assert_eq!(config.preset, "medium");
    assert_eq!(config.container, "mp4");
    assert!(config.is_supported_input(Path::new("trip.MKV")));

    assert_eq!(
        config.suggest_output_path(Some(Path::new("/videos/trip.mkv"))),
        Path::new("/videos/trip_small.mp4")
    );
    assert_eq!(
        config.default_encoding_params().to_args(),
        vec!["-c:v", "libx265", "-c:a", "aac", "-crf", "28", "-preset", "medium"]
    );
}

#[test]
fn test_invalid_config_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{ "crf": "high" }"#).unwrap();

    assert!(matches!(
        EncodingConfig::from_json_file(&path),
        Err(CoreError::Json(_))
    ));
}

#[test]
fn test_missing_config_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        EncodingConfig::from_json_file(&dir.path().join("absent.json")),
        Err(CoreError::Io(_))
    ));
}
