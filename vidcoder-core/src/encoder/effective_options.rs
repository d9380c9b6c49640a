//! Detection of the option set ffmpeg reports it applied.
//!
//! Encoders such as libx264 print a line like
//! `[libx264 @ 0x55d1] options: cabac=1 ref=3 deblock=1:0:0 ...` once they
//! have accepted their configuration. Seeing that line is what moves an
//! encoding attempt into the `Encoding` state. The match is a plain
//! substring search on `options:`; keep any change to that heuristic in
//! this module.

use std::collections::BTreeMap;

/// Options ffmpeg reported as applied, keyed by option name.
pub type EffectiveOptions = BTreeMap<String, String>;

/// Marker that introduces the option list.
pub const OPTIONS_MARKER: &str = "options:";

/// Returns the parsed options if `line` carries the marker, `None` otherwise.
///
/// Everything after the marker is split on whitespace; each token is split at
/// its first `=`. Tokens without `=` are kept with an empty value.
pub fn parse_effective_options(line: &str) -> Option<EffectiveOptions> {
    let (_, rest) = line.split_once(OPTIONS_MARKER)?;
    Some(
        rest.split_whitespace()
            .map(|token| match token.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (token.to_string(), String::new()),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x264_options_line() {
        let line = "[libx264 @ 0x5581] options: cabac=1 ref=3 deblock=1:0:0 analyse=0x3:0x113 crf=23.0";
        let options = parse_effective_options(line).unwrap();
        assert_eq!(options.get("crf").map(String::as_str), Some("23.0"));
        assert_eq!(options.get("deblock").map(String::as_str), Some("1:0:0"));
        assert_eq!(options.len(), 5);
    }

    #[test]
    fn test_lines_without_marker() {
        assert!(parse_effective_options("Stream mapping:").is_none());
        assert!(parse_effective_options("frame=  100 fps=25").is_none());
    }

    #[test]
    fn test_marker_with_empty_list() {
        let options = parse_effective_options("options:").unwrap();
        assert!(options.is_empty());
    }
}
