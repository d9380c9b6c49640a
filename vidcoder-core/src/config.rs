// ============================================================================
// vidcoder-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Tool locations and encoding defaults
//
// Nothing in the library reads the environment on its own. `ToolPaths` is
// built once by the consumer (usually through `ToolPaths::from_env`) and
// threaded through every constructor that spawns a binary.
//
// KEY COMPONENTS:
// - ToolPaths: where the ffmpeg and ffprobe binaries live
// - EncodingConfig: default codecs, quality and naming, loadable from JSON

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::process::OptionMap;

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

/// Overrides the ffmpeg binary used by [`ToolPaths::from_env`].
pub const FFMPEG_EXECUTABLE_ENV: &str = "FFMPEG_EXECUTABLE";

/// Overrides the ffprobe binary used by [`ToolPaths::from_env`].
pub const FFPROBE_EXECUTABLE_ENV: &str = "FFPROBE_EXECUTABLE";

// ============================================================================
// TOOL PATHS
// ============================================================================

/// Locations of the two external binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    /// Bare names, resolved through `PATH` at spawn time.
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl ToolPaths {
    /// Reads `FFMPEG_EXECUTABLE` and `FFPROBE_EXECUTABLE`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let resolve = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .map_or(default, PathBuf::from)
        };
        Self {
            ffmpeg: resolve(FFMPEG_EXECUTABLE_ENV, defaults.ffmpeg),
            ffprobe: resolve(FFPROBE_EXECUTABLE_ENV, defaults.ffprobe),
        }
    }
}

// ============================================================================
// ENCODING CONFIGURATION
// ============================================================================

/// Default CRF for x264/x265 style encoders. Lower is better quality.
pub const DEFAULT_CRF: u8 = 23;

/// Default encoder speed preset.
pub const DEFAULT_PRESET: &str = "medium";

/// Defaults used when the caller does not specify encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    // ---- Encoder Settings ----
    pub video_codec: String,
    pub audio_codec: String,
    /// Container extension of suggested outputs, without the dot.
    pub container: String,
    pub crf: u8,
    pub preset: String,

    // ---- File Handling ----
    /// Extensions accepted as input, lowercase, without the dot.
    pub supported_input_extensions: Vec<String>,
    pub supported_output_extensions: Vec<String>,
    /// Inserted between the input stem and the container extension.
    pub output_suffix: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            container: "mp4".to_string(),
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            supported_input_extensions: ["mp4", "avi", "mkv", "mov", "wmv", "flv"]
                .map(String::from)
                .to_vec(),
            supported_output_extensions: ["mp4", "mkv"].map(String::from).to_vec(),
            output_suffix: ".reenc".to_string(),
        }
    }
}

impl EncodingConfig {
    /// Loads a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        log::debug!("Loaded encoding config from {}", path.display());
        Ok(config)
    }

    /// Output options `c:v`, `c:a`, `crf`, `preset`, in that order.
    pub fn default_encoding_params(&self) -> OptionMap {
        OptionMap::new()
            .with("c:v", self.video_codec.as_str())
            .with("c:a", self.audio_codec.as_str())
            .with("crf", self.crf.to_string())
            .with("preset", self.preset.as_str())
    }

    /// `<dir>/<stem><suffix>.<container>` next to the input, or
    /// `output<suffix>.<container>` without one.
    pub fn suggest_output_path(&self, input: Option<&Path>) -> PathBuf {
        let Some(input) = input.filter(|p| !p.as_os_str().is_empty()) else {
            return PathBuf::from(format!("output{}.{}", self.output_suffix, self.container));
        };
        let stem = input
            .file_stem()
            .map_or_else(|| "output".into(), OsStr::to_string_lossy);
        let name = format!("{}{}.{}", stem, self.output_suffix, self.container);
        match input.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Case-insensitive check of the file extension.
    pub fn is_supported_input(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| {
                self.supported_input_extensions
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_tool_paths_from_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(FFMPEG_EXECUTABLE_ENV, "/opt/ffmpeg/bin/ffmpeg"), (FFPROBE_EXECUTABLE_ENV, "  ")]);
        let paths = ToolPaths::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(paths.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(paths.ffprobe, PathBuf::from("ffprobe"));
    }

    #[test]
    fn test_default_params_order() {
        let params = EncodingConfig::default().default_encoding_params();
        assert_eq!(
            params.to_args(),
            vec!["-c:v", "libx264", "-c:a", "aac", "-crf", "23", "-preset", "medium"]
        );
    }

    #[test]
    fn test_suggest_output_path() {
        let config = EncodingConfig::default();
        assert_eq!(
            config.suggest_output_path(Some(Path::new("/videos/holiday.mov"))),
            PathBuf::from("/videos/holiday.reenc.mp4")
        );
        assert_eq!(config.suggest_output_path(None), PathBuf::from("output.reenc.mp4"));
    }

    #[test]
    fn test_supported_input() {
        let config = EncodingConfig::default();
        assert!(config.is_supported_input(Path::new("a/b/CLIP.MKV")));
        assert!(!config.is_supported_input(Path::new("notes.txt")));
        assert!(!config.is_supported_input(Path::new("no_extension")));
    }
}
