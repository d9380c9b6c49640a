//! Validated x264-style encoding settings.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CRF, DEFAULT_PRESET};
use crate::error::{CoreError, CoreResult};
use crate::process::OptionMap;

/// Highest CRF accepted by x264/x265.
pub const MAX_CRF: u8 = 51;

/// Speed presets from fastest to slowest.
pub const VALID_PRESETS: [&str; 9] = [
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

/// Encoder settings whose setters reject values ffmpeg would refuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSettings {
    codec: String,
    crf: u8,
    preset: String,
    audio_codec: String,
    audio_bitrate: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl EncodingSettings {
    pub fn codec(&self) -> &str {
        &self.codec
    }

    pub fn set_codec(&mut self, codec: impl Into<String>) {
        self.codec = codec.into();
    }

    pub fn crf(&self) -> u8 {
        self.crf
    }

    /// # Errors
    ///
    /// [`CoreError::Setting`] unless `crf` is within `0..=51`.
    pub fn set_crf(&mut self, crf: u8) -> CoreResult<()> {
        if crf > MAX_CRF {
            return Err(CoreError::Setting(format!(
                "CRF must be between 0 and {MAX_CRF}, got {crf}"
            )));
        }
        self.crf = crf;
        Ok(())
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// # Errors
    ///
    /// [`CoreError::Setting`] unless `preset` is one of [`VALID_PRESETS`].
    pub fn set_preset(&mut self, preset: &str) -> CoreResult<()> {
        if !VALID_PRESETS.contains(&preset) {
            return Err(CoreError::Setting(format!(
                "Invalid preset '{preset}'. Choose from: {}",
                VALID_PRESETS.join(", ")
            )));
        }
        self.preset = preset.to_string();
        Ok(())
    }

    pub fn audio_codec(&self) -> &str {
        &self.audio_codec
    }

    pub fn set_audio_codec(&mut self, codec: impl Into<String>) {
        self.audio_codec = codec.into();
    }

    pub fn audio_bitrate(&self) -> &str {
        &self.audio_bitrate
    }

    pub fn set_audio_bitrate(&mut self, bitrate: impl Into<String>) {
        self.audio_bitrate = bitrate.into();
    }

    /// Output options for the encoder: `c:v crf preset c:a b:a`.
    pub fn to_options(&self) -> OptionMap {
        OptionMap::new()
            .with("c:v", self.codec.as_str())
            .with("crf", self.crf.to_string())
            .with("preset", self.preset.as_str())
            .with("c:a", self.audio_codec.as_str())
            .with("b:a", self.audio_bitrate.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crf_bounds() {
        let mut settings = EncodingSettings::default();
        assert!(settings.set_crf(0).is_ok());
        assert!(settings.set_crf(51).is_ok());
        let err = settings.set_crf(52).unwrap_err();
        assert!(matches!(err, CoreError::Setting(_)));
        assert_eq!(settings.crf(), 51);
    }

    #[test]
    fn test_preset_validation() {
        let mut settings = EncodingSettings::default();
        settings.set_preset("veryslow").unwrap();
        assert!(matches!(settings.set_preset("ludicrous"), Err(CoreError::Setting(_))));
        assert_eq!(settings.preset(), "veryslow");
    }

    #[test]
    fn test_to_options() {
        let mut settings = EncodingSettings::default();
        settings.set_codec("libx265");
        assert_eq!(
            settings.to_options().to_args(),
            vec!["-c:v", "libx265", "-crf", "23", "-preset", "medium", "-c:a", "aac", "-b:a", "128k"]
        );
    }
}
