//! Layered, case-insensitive configuration values.

use std::collections::BTreeMap;

use serde::Serialize;

/// Where a configuration value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Default,
    GlobalFile,
    UserFile,
    Environment,
    Flag,
}

/// A single configuration value and its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: ConfigSource,
}

/// Effective configuration after all sources were applied.
///
/// Keys are normalised to lower case. A write never replaces a value that
/// came from a higher-precedence source; equal precedence is last writer wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectiveConfig {
    entries: BTreeMap<String, ConfigEntry>,
}

impl EffectiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` from `source`. Returns `true` if the value was applied.
    pub fn set(&mut self, source: ConfigSource, key: &str, value: impl Into<String>) -> bool {
        let key = normalize_key(key);
        if let Some(existing) = self.entries.get(&key) {
            if existing.source > source {
                return false;
            }
        }
        self.entries.insert(
            key,
            ConfigEntry {
                value: value.into(),
                source,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&normalize_key(key))
            .map(|e| e.value.as_str())
    }

    pub fn source(&self, key: &str) -> Option<ConfigSource> {
        self.entries.get(&normalize_key(key)).map(|e| e.source)
    }

    /// The libStorage-style host endpoint.
    pub fn host(&self) -> &str {
        self.get(keys::HOST).unwrap_or_default()
    }

    pub fn service(&self) -> &str {
        self.get(keys::SERVICE).unwrap_or_default()
    }

    /// Configured log level (unparsed).
    pub fn log_level(&self) -> &str {
        self.get(keys::LOG_LEVEL).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dotted paths of the registered global keys.
pub mod keys {
    pub const HOST: &str = "volctl.host";
    pub const SERVICE: &str = "volctl.service";
    pub const LOG_LEVEL: &str = "volctl.loglevel";
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut config = EffectiveConfig::new();
        config.set(ConfigSource::Default, "Volctl.LogLevel", "warn");

        assert_eq!(config.get("volctl.loglevel"), Some("warn"));
        assert_eq!(config.get("VOLCTL.LOGLEVEL"), Some("warn"));
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_lower_source_never_overrides() {
        let mut config = EffectiveConfig::new();
        assert!(config.set(ConfigSource::Flag, keys::HOST, "tcp://flag"));
        assert!(!config.set(ConfigSource::UserFile, keys::HOST, "tcp://file"));

        assert_eq!(config.host(), "tcp://flag");
        assert_eq!(config.source(keys::HOST), Some(ConfigSource::Flag));
    }

    #[test]
    fn test_last_writer_wins_within_source() {
        let mut config = EffectiveConfig::new();
        config.set(ConfigSource::Default, keys::SERVICE, "a");
        config.set(ConfigSource::GlobalFile, keys::SERVICE, "b");
        config.set(ConfigSource::GlobalFile, keys::SERVICE, "c");

        assert_eq!(config.service(), "c");
    }

    #[test]
    fn test_missing_keys() {
        let config = EffectiveConfig::new();
        assert_eq!(config.host(), "");
        assert_eq!(config.source(keys::HOST), None);
        assert!(config.is_empty());
    }
}
