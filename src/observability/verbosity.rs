//! Log-level resolution.
//!
//! Several environment signals can ask for a verbosity. They are evaluated
//! in a fixed order and the first one that applies wins:
//!
//! 1. `VOLCTL_DEBUG` (bool) forces `debug`
//! 2. `STORAGE_DEBUG` (bool) forces `debug`
//! 3. `VOLCTL_LOG_LEVEL` if it parses
//! 4. `STORAGE_LOGGING_LEVEL` if it parses
//! 5. the configured `volctl.loglevel` (default `warn`)
//!
//! An explicit level that does not parse falls through to the next source.
//! It is kept in [`Resolution::rejected`] so it can be reported once logging
//! is running.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::config::env::{vars, Environment};

/// Ordered verbosity threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl Verbosity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log level {0:?}")]
pub struct ParseVerbosityError(pub String);

impl FromStr for Verbosity {
    type Err = ParseVerbosityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Verbosity::Error),
            "warn" | "warning" => Ok(Verbosity::Warn),
            "info" => Ok(Verbosity::Info),
            "debug" => Ok(Verbosity::Debug),
            _ => Err(ParseVerbosityError(s.to_string())),
        }
    }
}

/// Which input decided the verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    DebugToggle,
    StorageDebugToggle,
    LogLevel,
    StorageLogLevel,
    Config,
}

/// A level input that was present but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLevel {
    /// Variable or config key the value came from.
    pub origin: String,
    pub value: String,
}

/// Outcome of level resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub level: Verbosity,
    pub source: LevelSource,
    /// Set only when a debug toggle forced the level.
    pub debug_mode: bool,
    pub rejected: Vec<RejectedLevel>,
}

impl Resolution {
    /// Environment pairs that carry the resolved level to collaborators.
    pub fn exports(&self) -> [(&'static str, String); 2] {
        [
            (vars::EXPORTED_LOG_LEVEL, self.level.to_string()),
            (vars::STORAGE_LOG_LEVEL, self.level.to_string()),
        ]
    }

    /// Emit one warning per rejected input.
    pub fn report(&self) {
        for rejected in &self.rejected {
            tracing::warn!(
                origin = %rejected.origin,
                value = %rejected.value,
                "ignoring unparseable log level"
            );
        }
        tracing::debug!(level = %self.level, source = ?self.source, "log level resolved");
    }
}

/// Resolve the effective verbosity.
///
/// `configured` is the value of `volctl.loglevel` from the effective config.
pub fn resolve(env: &Environment, configured: &str) -> Resolution {
    let mut rejected = Vec::new();

    let toggles = [
        (vars::DEBUG, LevelSource::DebugToggle),
        (vars::STORAGE_DEBUG, LevelSource::StorageDebugToggle),
    ];
    for (var, source) in toggles {
        if env.get(var).and_then(parse_bool) == Some(true) {
            return Resolution {
                level: Verbosity::Debug,
                source,
                debug_mode: true,
                rejected,
            };
        }
    }

    let explicit = [
        (vars::LOG_LEVEL, LevelSource::LogLevel),
        (vars::STORAGE_LOG_LEVEL, LevelSource::StorageLogLevel),
    ];
    for (var, source) in explicit {
        let Some(value) = env.non_empty(var) else {
            continue;
        };
        match value.parse::<Verbosity>() {
            Ok(level) => {
                return Resolution {
                    level,
                    source,
                    debug_mode: false,
                    rejected,
                }
            }
            Err(_) => rejected.push(RejectedLevel {
                origin: var.to_string(),
                value: value.to_string(),
            }),
        }
    }

    let level = match configured.parse::<Verbosity>() {
        Ok(level) => level,
        Err(_) => {
            if !configured.is_empty() {
                rejected.push(RejectedLevel {
                    origin: crate::config::effective::keys::LOG_LEVEL.to_string(),
                    value: configured.to_string(),
                });
            }
            Verbosity::default()
        }
    };

    Resolution {
        level,
        source: LevelSource::Config,
        debug_mode: false,
        rejected,
    }
}

/// Boolean grammar used by the debug toggles.
///
/// Returns `None` for anything outside the accepted spellings.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_verbosity_ordering_and_parse() {
        assert!(Verbosity::Error < Verbosity::Warn);
        assert!(Verbosity::Info < Verbosity::Debug);
        assert_eq!("WARNING".parse::<Verbosity>(), Ok(Verbosity::Warn));
        assert_eq!(" Info ".parse::<Verbosity>(), Ok(Verbosity::Info));
        assert!("verbose".parse::<Verbosity>().is_err());
    }

    #[test]
    fn test_parse_bool_grammar() {
        for v in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_toggle_beats_explicit_level() {
        let res = resolve(&env(&[(vars::DEBUG, "true"), (vars::LOG_LEVEL, "error")]), "warn");
        assert_eq!(res.level, Verbosity::Debug);
        assert_eq!(res.source, LevelSource::DebugToggle);
        assert!(res.debug_mode);
    }

    #[test]
    fn test_storage_toggle() {
        let res = resolve(&env(&[(vars::DEBUG, "false"), (vars::STORAGE_DEBUG, "1")]), "warn");
        assert_eq!(res.level, Verbosity::Debug);
        assert_eq!(res.source, LevelSource::StorageDebugToggle);
    }

    #[test]
    fn test_explicit_level_is_exported() {
        let res = resolve(&env(&[(vars::LOG_LEVEL, "info")]), "warn");
        assert_eq!(res.level, Verbosity::Info);
        assert_eq!(res.source, LevelSource::LogLevel);
        assert!(!res.debug_mode);

        let exports = res.exports();
        assert_eq!(exports[0], (vars::EXPORTED_LOG_LEVEL, "info".to_string()));
        assert_eq!(exports[1], (vars::STORAGE_LOG_LEVEL, "info".to_string()));
    }

    #[test]
    fn test_invalid_level_falls_through_and_is_recorded() {
        let res = resolve(
            &env(&[(vars::LOG_LEVEL, "loud"), (vars::STORAGE_LOG_LEVEL, "error")]),
            "warn",
        );
        assert_eq!(res.level, Verbosity::Error);
        assert_eq!(res.source, LevelSource::StorageLogLevel);
        assert_eq!(
            res.rejected,
            vec![RejectedLevel {
                origin: vars::LOG_LEVEL.to_string(),
                value: "loud".to_string(),
            }]
        );
    }

    #[test]
    fn test_config_fallback() {
        assert_eq!(resolve(&Environment::default(), "warn").level, Verbosity::Warn);
        assert_eq!(resolve(&Environment::default(), "debug").level, Verbosity::Debug);

        let res = resolve(&Environment::default(), "chatty");
        assert_eq!(res.level, Verbosity::Warn);
        assert_eq!(res.source, LevelSource::Config);
        assert_eq!(res.rejected.len(), 1);
    }
}
