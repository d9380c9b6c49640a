// ============================================================================
// vidcoder-core/src/media/mod.rs
// ============================================================================
//
// MEDIA DESCRIPTION: Read-only model of one probed media file
//
// A `MediaDescription` is built once from an ffprobe report and never
// mutated. It groups the stream records by kind (report order preserved),
// names the first video and audio streams as the "main" ones, and runs an
// integrity check at construction time whose verdict is exposed through
// `failed()` / `failure_causes()`.
//
// KEY COMPONENTS:
// - ProbeReport: the raw `{format, streams}` document
// - MediaDescription: typed facade plus derived properties
// - ratio / stream / format: the building blocks

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::warn;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::utils::{format_bytes, format_duration, format_si};

pub mod format;
pub mod ratio;
pub mod stream;

pub use format::FormatInfo;
pub use ratio::Ratio;
pub use stream::{AudioStream, StreamKind, StreamRecord, VideoStream};

// ============================================================================
// RAW REPORT
// ============================================================================

/// The JSON document printed by `ffprobe -print_format json -show_streams -show_format`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub format: Map<String, Value>,
    #[serde(default)]
    pub streams: Vec<Map<String, Value>>,
}

// ============================================================================
// MEDIA DESCRIPTION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MediaDescription {
    file_path: PathBuf,
    format: FormatInfo,
    streams: BTreeMap<StreamKind, Vec<StreamRecord>>,
    failure_causes: Vec<String>,
}

impl MediaDescription {
    /// Builds the description and runs the integrity check.
    pub fn from_report(file_path: impl Into<PathBuf>, report: ProbeReport) -> Self {
        let file_path = file_path.into();

        let mut streams: BTreeMap<StreamKind, Vec<StreamRecord>> = StreamKind::KNOWN
            .iter()
            .map(|kind| (*kind, Vec::new()))
            .collect();

        for raw in report.streams {
            let record = StreamRecord::from_raw(raw);
            if record.kind() == StreamKind::Other {
                warn!(
                    "Unknown codec type '{}' in {}",
                    record.codec_type(),
                    file_path.display()
                );
            }
            streams.entry(record.kind()).or_default().push(record);
        }

        let mut description = Self {
            file_path,
            format: FormatInfo::from_raw(report.format),
            streams,
            failure_causes: Vec::new(),
        };
        description.failure_causes = description.integrity_failures();
        description
    }

    fn integrity_failures(&self) -> Vec<String> {
        let video = self.main_video_stream();
        if video.is_none() && self.main_audio_stream().is_none() {
            return vec!["No main video or audio stream detected.".to_string()];
        }

        let mut causes = Vec::new();
        if let Some(video) = video {
            if video.width() <= 0 {
                causes.push("Missing video width.".to_string());
            }
            if video.height() <= 0 {
                causes.push("Missing video height.".to_string());
            }
            if video.frame_rate() <= 0.0 {
                causes.push("Missing video frame rate.".to_string());
            }
            if video.bit_rate() <= 0 {
                causes.push("Missing video bit rate.".to_string());
            }
        }
        causes
    }

    // ---- Identity and container ----

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> &FormatInfo {
        &self.format
    }

    /// Container duration in seconds.
    pub fn duration(&self) -> f64 {
        self.format.duration()
    }

    /// Reported size, falling back to the size on disk when the report has none.
    pub fn size(&self) -> u64 {
        match self.format.size() {
            0 => fs::metadata(&self.file_path).map_or(0, |m| m.len()),
            size => size,
        }
    }

    // ---- Streams ----

    /// Streams of one kind in report order.
    pub fn streams(&self, kind: StreamKind) -> &[StreamRecord] {
        self.streams.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// All buckets, including the empty known ones.
    pub fn streams_by_kind(&self) -> &BTreeMap<StreamKind, Vec<StreamRecord>> {
        &self.streams
    }

    pub fn main_video_stream(&self) -> Option<VideoStream<'_>> {
        self.streams(StreamKind::Video)
            .first()
            .and_then(StreamRecord::as_video)
    }

    pub fn main_audio_stream(&self) -> Option<AudioStream<'_>> {
        self.streams(StreamKind::Audio)
            .first()
            .and_then(StreamRecord::as_audio)
    }

    pub fn has_video_stream(&self) -> bool {
        self.main_video_stream().is_some()
    }

    pub fn has_audio_stream(&self) -> bool {
        self.main_audio_stream().is_some()
    }

    /// Frame count of the main video stream, estimated from the container
    /// duration when the stream carries neither a count nor a duration.
    pub fn total_frames(&self) -> u64 {
        self.main_video_stream().map_or(0, |video| match video.frame_count() {
            0 => video.frame_count_with_duration(self.duration()),
            frames => frames,
        })
    }

    // ---- Integrity ----

    pub fn failed(&self) -> bool {
        !self.failure_causes.is_empty()
    }

    pub fn failure_causes(&self) -> &[String] {
        &self.failure_causes
    }

    // ---- Creation time ----

    /// Best guess at when the media was recorded: the earliest of the
    /// date-like format tags, a date stamp in the file name, and the file's
    /// modification time.
    pub fn creation_time(&self) -> Option<DateTime<Local>> {
        let from_tags = self
            .format
            .tags()
            .iter()
            .filter(|(key, _)| {
                let key = key.to_ascii_lowercase();
                key.ends_with("time") || key.ends_with("date")
            })
            .filter_map(|(_, value)| parse_tag_datetime(value));

        let from_name = self
            .file_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(date_from_file_name);

        let from_mtime = fs::metadata(&self.file_path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);

        from_tags.chain(from_name).chain(from_mtime).min()
    }

    // ---- Human summaries ----

    /// One-line summary: resolution, duration and size.
    pub fn summary(&self) -> String {
        let resolution = self
            .main_video_stream()
            .map_or_else(|| "no video".to_string(), |v| v.resolution());
        format!(
            "Summary: {}, {}, {}",
            resolution,
            format_duration(self.duration()),
            format_bytes(self.size())
        )
    }

    /// Multi-line description of the container and the main streams.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Duration: {} - Size: {}",
            format_duration(self.duration()),
            format_bytes(self.size())
        )];

        if let Some(video) = self.main_video_stream() {
            let mut line = format!("video: {}", video.codec_name().unwrap_or("unknown"));
            if !video.profile().is_empty() {
                line.push_str(&format!(" ({})", video.profile()));
            }
            line.push_str(&format!(
                " {} [SAR {} DAR {}] {}B/s {:.3}fps [BPP {}]",
                video.resolution(),
                display_ratio(video.sample_aspect_ratio()),
                display_ratio(video.display_aspect_ratio()),
                format_si(video.bit_rate() as f64 / 8.0),
                video.frame_rate(),
                video.bits_per_pixel()
            ));
            lines.push(line);
        }

        if let Some(audio) = self.main_audio_stream() {
            let mut line = format!("audio: {}", audio.codec_name().unwrap_or("unknown"));
            if !audio.profile().is_empty() {
                line.push_str(&format!(" ({})", audio.profile()));
            }
            line.push_str(&format!(" {}ch", audio.channels()));
            if !audio.channel_layout().is_empty() {
                line.push_str(&format!(" ({})", audio.channel_layout()));
            }
            line.push_str(&format!(
                " {}Hz {}b/s",
                audio.sample_rate(),
                format_si(audio.bit_rate() as f64)
            ));
            lines.push(line);
        }

        lines
    }

    /// Serializable snapshot; `include_raw` adds the untouched report entries.
    pub fn to_json(&self, include_raw: bool) -> Value {
        let mut data = json!({
            "path": self.file_path.display().to_string(),
            "duration": self.duration(),
            "duration_human": format_duration(self.duration()),
            "size": self.size(),
            "size_human": format_bytes(self.size()),
            "creation_time": self.creation_time().map(|t| t.to_rfc3339()),
            "failed": self.failed(),
            "failure_causes": self.failure_causes,
            "has_video_stream": self.has_video_stream(),
            "has_audio_stream": self.has_audio_stream(),
        });

        if let Some(video) = self.main_video_stream() {
            data["video_stream"] = json!({
                "codec": video.codec_name(),
                "resolution": video.resolution(),
                "width": video.width(),
                "height": video.height(),
                "frame_rate": video.frame_rate_str(),
                "bit_rate": video.bit_rate(),
                "rotation": video.rotation(),
                "sample_aspect_ratio": video.sample_aspect_ratio(),
                "display_aspect_ratio": video.display_aspect_ratio(),
                "nb_frames": self.total_frames(),
                "bits_per_pixel": video.bits_per_pixel(),
            });
        }
        if let Some(audio) = self.main_audio_stream() {
            data["audio_stream"] = json!({
                "codec": audio.codec_name(),
                "channels": audio.channels(),
                "channel_layout": audio.channel_layout(),
                "sample_rate": audio.sample_rate(),
                "bit_rate": audio.bit_rate(),
            });
        }

        if include_raw {
            data["raw_format"] = Value::Object(self.format.raw().clone());
            data["raw_streams"] = self
                .streams
                .values()
                .flatten()
                .map(|s| Value::Object(s.raw().clone()))
                .collect();
        }
        data
    }
}

fn display_ratio(ratio: Option<Ratio>) -> String {
    ratio.map_or_else(|| "?".to_string(), |r| r.to_string())
}

// ============================================================================
// DATE PARSING
// ============================================================================

/// Parses the date formats muxers put in `creation_time`-style tags.
/// Naive values are taken as UTC, which is what ffmpeg writes.
fn parse_tag_datetime(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&naive).with_timezone(&Local));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).with_timezone(&Local))
}

/// Finds a `YYYYMMDD` stamp, optionally followed by `_HHMMSS` or `-HHMMSS`,
/// in a file name such as `VID_20230514_183011`. The stamp is local time.
fn date_from_file_name(name: &str) -> Option<DateTime<Local>> {
    let bytes = name.as_bytes();
    let digits_at = |start: usize, len: usize| {
        bytes.len() >= start + len && bytes[start..start + len].iter().all(u8::is_ascii_digit)
    };
    let number = |start: usize, len: usize| name[start..start + len].parse::<u32>().ok();

    for start in 0..bytes.len() {
        if !digits_at(start, 8) || (start > 0 && bytes[start - 1].is_ascii_digit()) {
            continue;
        }
        let Some(date) = NaiveDate::from_ymd_opt(
            number(start, 4)? as i32,
            number(start + 4, 2)?,
            number(start + 6, 2)?,
        ) else {
            continue;
        };

        let time_start = start + 9;
        let has_time = bytes.get(start + 8).is_some_and(|b| *b == b'_' || *b == b'-')
            && digits_at(time_start, 6);
        let naive = if has_time {
            date.and_hms_opt(
                number(time_start, 2)?,
                number(time_start + 2, 2)?,
                number(time_start + 4, 2)?,
            )
        } else {
            date.and_hms_opt(0, 0, 0)
        };

        if let Some(dt) = naive.and_then(|n| Local.from_local_datetime(&n).earliest()) {
            return Some(dt);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn report(value: Value) -> ProbeReport {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_no_streams_is_failed() {
        let media = MediaDescription::from_report("/tmp/empty.mkv", report(json!({})));
        assert!(media.failed());
        assert_eq!(media.failure_causes().len(), 1);
        assert!(!media.has_video_stream());
        assert!(!media.has_audio_stream());
    }

    #[test]
    fn test_audio_only_is_not_failed() {
        let media = MediaDescription::from_report(
            "/tmp/song.flac",
            report(json!({
                "format": {"duration": "180.0"},
                "streams": [{"codec_type": "audio", "codec_name": "flac", "sample_rate": "44100", "channels": 2}]
            })),
        );
        assert!(!media.failed());
        assert!(media.failure_causes().is_empty());
        assert!(media.main_video_stream().is_none());
    }

    #[test]
    fn test_incomplete_video_lists_every_cause() {
        let media = MediaDescription::from_report(
            "/tmp/broken.mp4",
            report(json!({"streams": [{"codec_type": "video", "width": 640}]})),
        );
        assert!(media.failed());
        assert_eq!(media.failure_causes().len(), 3);
    }

    #[test]
    fn test_main_streams_are_first_of_kind() {
        let media = MediaDescription::from_report(
            "/tmp/multi.mkv",
            report(json!({"streams": [
                {"index": 0, "codec_type": "audio", "codec_name": "opus"},
                {"index": 1, "codec_type": "video", "codec_name": "hevc"},
                {"index": 2, "codec_type": "audio", "codec_name": "aac"},
                {"index": 3, "codec_type": "video", "codec_name": "mjpeg"},
                {"index": 4, "codec_type": "attachment"}
            ]})),
        );
        assert_eq!(media.main_audio_stream().unwrap().codec_name(), Some("opus"));
        assert_eq!(media.main_video_stream().unwrap().codec_name(), Some("hevc"));
        assert_eq!(media.streams(StreamKind::Audio).len(), 2);
        assert_eq!(media.streams(StreamKind::Other).len(), 1);
        assert_eq!(media.streams(StreamKind::Subtitle).len(), 0);
        let indexes: Vec<i64> = media
            .streams(StreamKind::Video)
            .iter()
            .map(StreamRecord::index)
            .collect();
        assert_eq!(indexes, vec![1, 3]);
    }

    #[test]
    fn test_total_frames_falls_back_to_container_duration() {
        let media = MediaDescription::from_report(
            "/tmp/clip.mkv",
            report(json!({
                "format": {"duration": "4.0"},
                "streams": [{"codec_type": "video", "r_frame_rate": "25/1"}]
            })),
        );
        assert_eq!(media.total_frames(), 100);
    }

    #[test]
    fn test_creation_time_prefers_earliest_tag() {
        let media = MediaDescription::from_report(
            "/nonexistent/dir/clip.mov",
            report(json!({"format": {"tags": {
                "creation_time": "2021-06-01T12:00:00.000000Z",
                "com.apple.quicktime.creationdate": "2021-05-31T08:30:00+02:00",
                "encoder": "Lavf"
            }}})),
        );
        let created = media.creation_time().unwrap().with_timezone(&Utc);
        assert_eq!(created.day(), 31);
        assert_eq!(created.hour(), 6);
    }

    #[test]
    fn test_date_from_file_name() {
        let dt = date_from_file_name("VID_20230514_183011").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 5, 14));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (18, 30, 11));

        let date_only = date_from_file_name("holiday-20191224").unwrap();
        assert_eq!(date_only.day(), 24);

        assert!(date_from_file_name("clip_99999999").is_none());
        assert!(date_from_file_name("no digits here").is_none());
    }

    #[test]
    fn test_to_json_includes_views() {
        let media = MediaDescription::from_report(
            "/tmp/a.mp4",
            report(json!({
                "format": {"duration": "10", "size": "2048"},
                "streams": [{"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "25/1", "bit_rate": "4000000"}]
            })),
        );
        let data = media.to_json(true);
        assert_eq!(data["video_stream"]["resolution"], "1920x1080");
        assert_eq!(data["video_stream"]["display_aspect_ratio"], "16/9");
        assert_eq!(data["video_stream"]["nb_frames"], 250);
        assert_eq!(data["raw_streams"].as_array().unwrap().len(), 1);
        assert!(data.get("audio_stream").is_none());
    }
}
