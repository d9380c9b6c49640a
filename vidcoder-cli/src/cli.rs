// vidcoder-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vidcoder_core::ToolPaths;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Vidcoder: supervised single-file transcoding",
    long_about = "Runs one ffmpeg encode with live progress and ETA, and describes media files using ffprobe."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-encodes one video file
    Encode(EncodeArgs),
    /// Prints a description of a media file
    Info(InfoArgs),
}

/// Locations of the external binaries.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// ffmpeg binary to run
    #[arg(long, value_name = "PATH", env = "FFMPEG_EXECUTABLE", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// ffprobe binary to run
    #[arg(long, value_name = "PATH", env = "FFPROBE_EXECUTABLE", default_value = "ffprobe")]
    pub ffprobe: PathBuf,
}

impl ToolArgs {
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Video file to encode
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (defaults to <INPUT stem>.reenc.mp4 next to the input)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    // --- Quality Overrides ---
    /// Constant rate factor, 0-51 (lower is better quality)
    #[arg(long, value_name = "CRF")]
    pub crf: Option<u8>,

    /// Encoder speed preset (ultrafast ... veryslow)
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// Video codec passed to -c:v
    #[arg(long, value_name = "CODEC")]
    pub vcodec: Option<String>,

    /// Audio codec passed to -c:a
    #[arg(long, value_name = "CODEC")]
    pub acodec: Option<String>,

    /// JSON file with encoding defaults
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Media file to describe
    #[arg(required = true, value_name = "FILE")]
    pub file: PathBuf,

    /// Print the description as JSON
    #[arg(long)]
    pub json: bool,

    /// Include the untouched ffprobe records in the JSON output
    #[arg(long, requires = "json")]
    pub raw: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcoder_core::config::{FFMPEG_EXECUTABLE_ENV, FFPROBE_EXECUTABLE_ENV};

    #[test]
    fn test_parse_encode_basic_args() {
        let cli = Cli::parse_from(["vidcoder", "encode", "holiday.mov"]);

        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.input, PathBuf::from("holiday.mov"));
                assert!(args.output.is_none());
                assert!(args.crf.is_none());
                assert!(args.preset.is_none());
                assert!(args.config.is_none());
            }
            other => panic!("Expected Encode command, got {other:?}"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_encode_overrides() {
        let cli = Cli::parse_from([
            "vidcoder",
            "encode",
            "in.mkv",
            "-o",
            "out.mp4",
            "--crf",
            "20",
            "--preset",
            "slow",
            "--vcodec",
            "libx265",
            "--acodec",
            "libopus",
            "--ffmpeg",
            "/opt/ffmpeg/bin/ffmpeg",
            "-v",
        ]);

        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out.mp4")));
                assert_eq!(args.crf, Some(20));
                assert_eq!(args.preset.as_deref(), Some("slow"));
                assert_eq!(args.vcodec.as_deref(), Some("libx265"));
                assert_eq!(args.acodec.as_deref(), Some("libopus"));
                assert_eq!(
                    args.tools.tool_paths().ffmpeg,
                    PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
                );
            }
            other => panic!("Expected Encode command, got {other:?}"),
        }
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_info_json() {
        let cli = Cli::parse_from(["vidcoder", "info", "clip.mp4", "--json", "--raw"]);
        match cli.command {
            Commands::Info(args) => {
                assert_eq!(args.file, PathBuf::from("clip.mp4"));
                assert!(args.json);
                assert!(args.raw);
            }
            other => panic!("Expected Info command, got {other:?}"),
        }
    }

    #[test]
    fn test_raw_requires_json() {
        assert!(Cli::try_parse_from(["vidcoder", "info", "clip.mp4", "--raw"]).is_err());
    }

    #[test]
    fn test_tool_env_names_match_core() {
        use clap::CommandFactory;

        let command = Cli::command();
        let encode = command
            .find_subcommand("encode")
            .expect("encode subcommand");
        let env_of = |id: &str| {
            encode
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .map(|e| e.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("ffmpeg").as_deref(), Some(FFMPEG_EXECUTABLE_ENV));
        assert_eq!(env_of("ffprobe").as_deref(), Some(FFPROBE_EXECUTABLE_ENV));
    }
}
