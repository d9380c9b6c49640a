//! Ordered ffmpeg option maps.
//!
//! Options keep their insertion order because ffmpeg is order sensitive, but
//! setting an existing key replaces its value in place. An empty value
//! renders as a bare flag (`-an`).

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMap {
    entries: Vec<(String, String)>,
}

impl OptionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts or replaces `key`. A leading `-` on the key is ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let key = key.trim_start_matches('-').to_string();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Adds a value-less flag such as `an`.
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.set(key, "");
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.trim_start_matches('-');
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = key.trim_start_matches('-');
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Applies every entry of `other` on top of this map.
    pub fn merge(&mut self, other: &OptionMap) {
        for (key, value) in &other.entries {
            self.set(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the map as ffmpeg arguments: `-key value` or `-flag`.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len() * 2);
        for (key, value) in &self.entries {
            args.push(format!("-{key}"));
            if !value.is_empty() {
                args.push(value.clone());
            }
        }
        args
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OptionMap::new();
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}

impl fmt::Display for OptionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut map = OptionMap::new().with("c:v", "libx264").with("crf", "23");
        map.set("-c:v", "libx265");
        assert_eq!(map.to_args(), vec!["-c:v", "libx265", "-crf", "23"]);
        assert_eq!(map.get("c:v"), Some("libx265"));
    }

    #[test]
    fn test_flags_render_without_value() {
        let mut map = OptionMap::new();
        map.set_flag("an");
        map.set("f", "mp4");
        assert_eq!(map.to_string(), "-an -f mp4");
    }

    #[test]
    fn test_merge_and_remove() {
        let mut base: OptionMap = [("crf", "23"), ("preset", "medium")].into_iter().collect();
        let overrides: OptionMap = [("preset", "slow"), ("tune", "film")].into_iter().collect();
        base.merge(&overrides);
        assert_eq!(
            base.iter().collect::<Vec<_>>(),
            vec![("crf", "23"), ("preset", "slow"), ("tune", "film")]
        );
        assert_eq!(base.remove("crf"), Some("23".to_string()));
        assert_eq!(base.remove("crf"), None);
        assert_eq!(base.len(), 2);
    }
}
