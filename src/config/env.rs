//! Environment snapshot.
//!
//! The process environment is read once at startup and passed around
//! explicitly. Nothing in the crate reads `std::env` after that point.

use std::collections::BTreeMap;

/// Environment variable names recognised by the lifecycle core.
pub mod vars {
    /// Primary debug toggle.
    pub const DEBUG: &str = "VOLCTL_DEBUG";
    /// Storage subsystem debug toggle.
    pub const STORAGE_DEBUG: &str = "STORAGE_DEBUG";
    /// Primary explicit log level.
    pub const LOG_LEVEL: &str = "VOLCTL_LOG_LEVEL";
    /// Storage subsystem explicit log level. Also written for collaborators.
    pub const STORAGE_LOG_LEVEL: &str = "STORAGE_LOGGING_LEVEL";
    /// Resolved level as seen by the config store's env layer.
    pub const EXPORTED_LOG_LEVEL: &str = "VOLCTL_LOGLEVEL";
    /// Stderr log format (`json` or `pretty`).
    pub const LOG_FORMAT: &str = "VOLCTL_LOG_FORMAT";

    pub const TRACE_PROFILE: &str = "VOLCTL_TRACE_PROFILE";
    pub const CPU_PROFILE: &str = "VOLCTL_CPU_PROFILE";
    pub const CPU_PROFILE_HZ: &str = "VOLCTL_CPU_PROFILE_HZ";
    pub const PROFILE_ADDR: &str = "VOLCTL_PROFILE_ADDR";

    /// Install prefix for the global config directory.
    pub const INSTALL_PREFIX: &str = "VOLCTL_HOME";
    pub const HOME: &str = "HOME";
    pub const USER_PROFILE: &str = "USERPROFILE";
}

/// Immutable snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Raw value, including empty strings.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key`, treating an empty string as unset.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
