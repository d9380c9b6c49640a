//! Container-level facts from the ffprobe `format` object.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::stream::{string_map, value_as_f64, value_as_i64};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatInfo {
    tags: BTreeMap<String, String>,
    raw: Map<String, Value>,
}

impl FormatInfo {
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        Self {
            tags: string_map(raw.get("tags")),
            raw,
        }
    }

    /// Total duration in seconds, never negative.
    pub fn duration(&self) -> f64 {
        value_as_f64(self.raw.get("duration")).unwrap_or(0.0).max(0.0)
    }

    /// Size in bytes as reported by ffprobe, 0 when absent.
    pub fn size(&self) -> u64 {
        value_as_i64(self.raw.get("size")).unwrap_or(0).max(0) as u64
    }

    pub fn bit_rate(&self) -> i64 {
        value_as_i64(self.raw.get("bit_rate")).unwrap_or(0)
    }

    pub fn format_name(&self) -> Option<&str> {
        self.raw.get("format_name").and_then(Value::as_str)
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Raw lookup for any field not exposed through a typed accessor.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}
