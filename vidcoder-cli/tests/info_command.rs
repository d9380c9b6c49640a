// `vidcoder info` against a shell script standing in for ffprobe.
//
// Kept in its own test binary with a single test: writing an executable
// while another test thread forks can make exec fail with ETXTBSY.

#![cfg(unix)]

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../vidcoder-core/tests/fixtures")
        .join(name)
}

#[test]
fn test_info_with_fake_ffprobe() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    fs::write(&input, b"not really a video").unwrap();

    let ffprobe = dir.path().join("ffprobe");
    fs::write(
        &ffprobe,
        format!("#!/bin/sh\ncat '{}'\n", fixture("h264_aac_1080p.json").display()),
    )
    .unwrap();
    fs::set_permissions(&ffprobe, fs::Permissions::from_mode(0o755)).unwrap();

    // ---- Human summary ----
    Command::cargo_bin("vidcoder")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("info")
        .arg(&input)
        .arg("--ffprobe")
        .arg(&ffprobe)
        .assert()
        .success()
        .stdout(contains("MEDIA INFO"))
        .stdout(contains("1 video, 1 audio, 1 data, 1 subtitle"))
        .stdout(contains("Duration: 00:00:20 - Size: 19.56 MiB"))
        .stdout(contains("video: h264 (High) 1920x1080 [SAR 1/1 DAR 16/9]"));

    // ---- JSON snapshot ----
    let output = Command::cargo_bin("vidcoder")
        .unwrap()
        .env_remove("RUST_LOG")
        .env("FFPROBE_EXECUTABLE", &ffprobe)
        .args(["info", "--json"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let data: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(data["video_stream"]["resolution"], "1920x1080");
    assert_eq!(data["audio_stream"]["channel_layout"], "stereo");
    assert_eq!(data["failed"], false);
    assert!(data.get("raw_streams").is_none());

    // ---- ffprobe failure ----
    fs::write(&ffprobe, "#!/bin/sh\necho 'moov atom not found' >&2\nexit 1\n").unwrap();
    Command::cargo_bin("vidcoder")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("info")
        .arg(&input)
        .arg("--ffprobe")
        .arg(&ffprobe)
        .assert()
        .failure()
        .stderr(contains("ffprobe failed with exit code 1: moov atom not found"));
}
