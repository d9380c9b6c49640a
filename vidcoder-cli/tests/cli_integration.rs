use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn vidcoder_cmd() -> Command {
    let mut cmd = Command::cargo_bin("vidcoder").expect("Failed to find vidcoder binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("FFMPEG_EXECUTABLE")
        .env_remove("FFPROBE_EXECUTABLE");
    cmd
}

#[test]
fn test_help_lists_commands() {
    vidcoder_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("encode"))
        .stdout(contains("info"));
}

#[test]
fn test_encode_non_existent_input() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("nothing_here.mkv");

    vidcoder_cmd()
        .arg("encode")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("does not exist"));

    Ok(())
}

#[test]
fn test_encode_invalid_crf() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("clip.mkv");
    std::fs::write(&input, "dummy content")?;

    // Rejected by the settings validation before any tool is started.
    vidcoder_cmd()
        .arg("encode")
        .arg(&input)
        .args(["--crf", "60", "--ffmpeg", "/nonexistent/ffmpeg"])
        .assert()
        .failure()
        .stderr(contains("CRF must be between 0 and 51, got 60"));

    Ok(())
}

#[test]
fn test_encode_invalid_preset() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("clip.mkv");
    std::fs::write(&input, "dummy content")?;

    vidcoder_cmd()
        .arg("encode")
        .arg(&input)
        .args(["--preset", "ludicrous"])
        .assert()
        .failure()
        .stderr(contains("Invalid preset 'ludicrous'"));

    Ok(())
}

#[test]
fn test_encode_missing_config_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("clip.mkv");
    std::fs::write(&input, "dummy content")?;

    vidcoder_cmd()
        .arg("encode")
        .arg(&input)
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(contains("IO error"));

    Ok(())
}

#[test]
fn test_encode_missing_ffmpeg() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("clip.mkv");
    std::fs::write(&input, "dummy content")?;

    vidcoder_cmd()
        .arg("encode")
        .arg(&input)
        .env("FFMPEG_EXECUTABLE", "/nonexistent/bin/ffmpeg")
        .assert()
        .failure()
        .stderr(contains("Failed to start /nonexistent/bin/ffmpeg"))
        .stderr(contains("Suggestion"));

    Ok(())
}

#[test]
fn test_info_missing_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    vidcoder_cmd()
        .arg("info")
        .arg(dir.path().join("nothing.mp4"))
        .assert()
        .failure()
        .stderr(contains("File not found"));

    Ok(())
}

#[test]
fn test_raw_without_json_is_rejected() {
    vidcoder_cmd()
        .args(["info", "clip.mp4", "--raw"])
        .assert()
        .failure()
        .stderr(contains("--json"));
}
