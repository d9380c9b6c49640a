//! Implementation of the 'info' subcommand.

use crate::cli::InfoArgs;
use crate::error::CliResult;
use crate::terminal;

use chrono::{DateTime, Local};
use log::warn;
use vidcoder_core::{MediaDescription, probe};

/// Probes the file and prints either the human summary or the JSON snapshot.
pub fn run_info(args: InfoArgs) -> CliResult<()> {
    let tools = args.tools.tool_paths();
    let media = probe(&tools.ffprobe, &args.file)?;

    if args.json {
        // Machine-readable output bypasses the logger.
        println!("{}", serde_json::to_string_pretty(&media.to_json(args.raw))?);
        return Ok(());
    }

    terminal::print_section("Media info");
    terminal::print_status("File", &media.file_path().display().to_string(), false);
    if let Some(created) = media.creation_time() {
        terminal::print_status("Created", &format_creation_time(created), false);
    }
    terminal::print_status("Streams", &stream_counts(&media), false);
    for line in media.summary_lines() {
        terminal::print_line(&line);
    }

    for cause in media.failure_causes() {
        warn!("{cause}");
    }
    Ok(())
}

fn format_creation_time(created: DateTime<Local>) -> String {
    created.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// `1 video, 2 audio, 1 subtitle`; empty buckets are left out.
fn stream_counts(media: &MediaDescription) -> String {
    let counts: Vec<String> = media
        .streams_by_kind()
        .iter()
        .filter(|(_, streams)| !streams.is_empty())
        .map(|(kind, streams)| format!("{} {}", streams.len(), kind))
        .collect();
    if counts.is_empty() {
        "none".to_string()
    } else {
        counts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidcoder_core::ProbeReport;

    fn media(report: serde_json::Value) -> MediaDescription {
        let report: ProbeReport = serde_json::from_value(report).unwrap();
        MediaDescription::from_report("/nonexistent/clip.mkv", report)
    }

    #[test]
    fn test_stream_counts_in_kind_order() {
        let media = media(serde_json::json!({
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 640, "height": 480},
                {"codec_type": "audio"},
                {"codec_type": "attachment"}
            ]
        }));
        assert_eq!(stream_counts(&media), "1 video, 2 audio, 1 other");
    }

    #[test]
    fn test_stream_counts_empty() {
        let media = media(serde_json::json!({}));
        assert_eq!(stream_counts(&media), "none");
    }
}
