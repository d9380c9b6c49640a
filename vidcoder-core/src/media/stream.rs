// ============================================================================
// vidcoder-core/src/media/stream.rs
// ============================================================================
//
// STREAM RECORDS: Typed views over ffprobe per-stream entries
//
// A `StreamRecord` owns one entry of the ffprobe `streams` array. The common
// fields are decoded once at construction; everything else stays in the raw
// map and is reachable through `extra()`. `VideoStream` and `AudioStream` are
// borrowed views that compute the kind-specific fields on demand.
//
// Numeric fields never fail: ffprobe is inconsistent about emitting numbers
// as JSON numbers or as strings, and an absent or unparsable value reads as 0.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::ratio::Ratio;

// ============================================================================
// STREAM KIND
// ============================================================================

/// Media kind of an elementary stream, taken from ffprobe's `codec_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Data,
    Chapters,
    Subtitle,
    /// Anything ffprobe reports that is not one of the kinds above.
    Other,
}

impl StreamKind {
    /// Kinds that always have a (possibly empty) bucket in a media description.
    pub const KNOWN: [StreamKind; 5] = [
        StreamKind::Video,
        StreamKind::Audio,
        StreamKind::Data,
        StreamKind::Chapters,
        StreamKind::Subtitle,
    ];

    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "data" => StreamKind::Data,
            "chapters" => StreamKind::Chapters,
            "subtitle" => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Data => "data",
            StreamKind::Chapters => "chapters",
            StreamKind::Subtitle => "subtitle",
            StreamKind::Other => "other",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RAW VALUE HELPERS
// ============================================================================

pub(crate) fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Flattens a JSON object of scalar values into a string map.
pub(crate) fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

// ============================================================================
// STREAM RECORD
// ============================================================================

/// One elementary stream from a probe report.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    kind: StreamKind,
    tags: BTreeMap<String, String>,
    disposition: BTreeMap<String, i64>,
    side_data: Vec<Map<String, Value>>,
    raw: Map<String, Value>,
}

impl StreamRecord {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        let kind = raw
            .get("codec_type")
            .and_then(Value::as_str)
            .map_or(StreamKind::Other, StreamKind::from_codec_type);

        let tags = string_map(raw.get("tags"));

        let disposition = match raw.get("disposition") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| value_as_i64(Some(v)).map(|n| (k.clone(), n)))
                .collect(),
            _ => BTreeMap::new(),
        };

        let side_data = match raw.get("side_data_list") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            _ => Vec::new(),
        };

        Self {
            kind,
            tags,
            disposition,
            side_data,
            raw,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// The `codec_type` exactly as reported, or `"unknown"`.
    pub fn codec_type(&self) -> &str {
        self.raw
            .get("codec_type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    pub fn codec_name(&self) -> Option<&str> {
        self.raw.get("codec_name").and_then(Value::as_str)
    }

    pub fn profile(&self) -> &str {
        self.raw.get("profile").and_then(Value::as_str).unwrap_or("")
    }

    /// Stream index within the container, `-1` when not reported.
    pub fn index(&self) -> i64 {
        value_as_i64(self.raw.get("index")).unwrap_or(-1)
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn disposition(&self) -> &BTreeMap<String, i64> {
        &self.disposition
    }

    pub fn side_data(&self) -> &[Map<String, Value>] {
        &self.side_data
    }

    /// Stream duration in seconds, 0.0 when absent (Matroska streams rarely carry one).
    pub fn duration(&self) -> f64 {
        value_as_f64(self.raw.get("duration")).unwrap_or(0.0).max(0.0)
    }

    pub fn bit_rate(&self) -> i64 {
        value_as_i64(self.raw.get("bit_rate")).unwrap_or(0)
    }

    /// Raw lookup for any field not exposed through a typed accessor.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Video view, if this is a video stream.
    pub fn as_video(&self) -> Option<VideoStream<'_>> {
        (self.kind == StreamKind::Video).then_some(VideoStream(self))
    }

    /// Audio view, if this is an audio stream.
    pub fn as_audio(&self) -> Option<AudioStream<'_>> {
        (self.kind == StreamKind::Audio).then_some(AudioStream(self))
    }
}

// ============================================================================
// VIDEO VIEW
// ============================================================================

/// Video-specific fields of a [`StreamRecord`].
#[derive(Debug, Clone, Copy)]
pub struct VideoStream<'a>(&'a StreamRecord);

impl<'a> VideoStream<'a> {
    pub fn record(&self) -> &'a StreamRecord {
        self.0
    }

    pub fn codec_name(&self) -> Option<&'a str> {
        self.0.codec_name()
    }

    pub fn profile(&self) -> &'a str {
        self.0.profile()
    }

    pub fn width(&self) -> i64 {
        value_as_i64(self.0.raw.get("width")).unwrap_or(0)
    }

    pub fn height(&self) -> i64 {
        value_as_i64(self.0.raw.get("height")).unwrap_or(0)
    }

    /// `"{width}x{height}"`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width(), self.height())
    }

    /// The `r_frame_rate` text as reported, `"0/1"` when absent.
    pub fn frame_rate_str(&self) -> &'a str {
        self.0
            .raw
            .get("r_frame_rate")
            .and_then(Value::as_str)
            .unwrap_or("0/1")
    }

    /// Frames per second; 0.0 for malformed text or a zero denominator.
    pub fn frame_rate(&self) -> f64 {
        Ratio::parse(self.frame_rate_str()).map_or(0.0, |r| r.to_f64())
    }

    pub fn bit_rate(&self) -> i64 {
        self.0.bit_rate()
    }

    pub fn duration(&self) -> f64 {
        self.0.duration()
    }

    /// Pixel shape. `1/1` when not reported, `None` when reported but unparsable.
    pub fn sample_aspect_ratio(&self) -> Option<Ratio> {
        match self.0.raw.get("sample_aspect_ratio").and_then(Value::as_str) {
            Some(text) => Ratio::parse(text),
            None => Ratio::new(1, 1),
        }
    }

    /// Intended on-screen shape.
    ///
    /// A usable reported value wins. Otherwise it is derived as
    /// `SAR * width/height`, or plain `width/height` when the SAR is
    /// missing or degenerate. `None` without both dimensions.
    pub fn display_aspect_ratio(&self) -> Option<Ratio> {
        let reported = self
            .0
            .raw
            .get("display_aspect_ratio")
            .and_then(Value::as_str)
            .and_then(Ratio::parse)
            .filter(|r| !r.is_degenerate());
        if reported.is_some() {
            return reported;
        }

        let (width, height) = (self.width(), self.height());
        if width <= 0 || height <= 0 {
            return None;
        }
        let shape = Ratio::new(width, height)?;
        match self.sample_aspect_ratio() {
            Some(sar) if !sar.is_degenerate() => Some(sar * shape),
            _ => Some(shape),
        }
    }

    /// Number of frames: the reported `nb_frames`, else `frame_rate * duration`.
    pub fn frame_count(&self) -> u64 {
        self.frame_count_with_duration(self.duration())
    }

    /// Like [`frame_count`](Self::frame_count) but estimating from the given duration.
    pub fn frame_count_with_duration(&self, duration: f64) -> u64 {
        if let Some(reported) = value_as_i64(self.0.raw.get("nb_frames")) {
            return reported.max(0) as u64;
        }
        let rate = self.frame_rate();
        if rate > 0.0 && duration > 0.0 {
            (rate * duration) as u64
        } else {
            0
        }
    }

    /// `bit_rate / frame_rate / width / height`, rounded to 6 decimals; 0.0 if any factor is zero.
    pub fn bits_per_pixel(&self) -> f64 {
        let rate = self.frame_rate();
        let (width, height) = (self.width(), self.height());
        if rate <= 0.0 || width <= 0 || height <= 0 {
            return 0.0;
        }
        let bpp = self.bit_rate() as f64 / rate / width as f64 / height as f64;
        (bpp * 1e6).round() / 1e6
    }

    /// Rotation in degrees within `[0, 360)`.
    ///
    /// Display-matrix side data overrides the legacy `rotate` tag.
    pub fn rotation(&self) -> i64 {
        let from_side_data = self
            .0
            .side_data
            .iter()
            .find_map(|entry| value_as_i64(entry.get("rotation")));
        let from_tag = self
            .0
            .tags
            .get("rotate")
            .and_then(|r| r.trim().parse::<i64>().ok());

        from_side_data.or(from_tag).unwrap_or(0).rem_euclid(360)
    }
}

// ============================================================================
// AUDIO VIEW
// ============================================================================

/// Audio-specific fields of a [`StreamRecord`].
#[derive(Debug, Clone, Copy)]
pub struct AudioStream<'a>(&'a StreamRecord);

impl<'a> AudioStream<'a> {
    pub fn record(&self) -> &'a StreamRecord {
        self.0
    }

    pub fn codec_name(&self) -> Option<&'a str> {
        self.0.codec_name()
    }

    pub fn profile(&self) -> &'a str {
        self.0.profile()
    }

    pub fn sample_rate(&self) -> i64 {
        value_as_i64(self.0.raw.get("sample_rate")).unwrap_or(0)
    }

    pub fn channels(&self) -> i64 {
        value_as_i64(self.0.raw.get("channels")).unwrap_or(0)
    }

    pub fn bit_rate(&self) -> i64 {
        self.0.bit_rate()
    }

    pub fn channel_layout(&self) -> &'a str {
        self.0
            .raw
            .get("channel_layout")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}
