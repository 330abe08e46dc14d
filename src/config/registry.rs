//! Configuration schema registration.
//!
//! Declares the recognised global keys and their defaults. Runs before any
//! other component reads configuration.

use serde::Serialize;

use crate::config::effective::keys;
use crate::config::paths::PathConfig;
use crate::config::store::ConfigStore;

/// A single registered configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigKey {
    /// Dotted key path, e.g. `volctl.host`.
    pub path: String,
    pub default: String,
    /// Environment variable overriding the key.
    pub env_var: String,
}

impl ConfigKey {
    /// Declare a key. The env var name is derived from the key path.
    pub fn new(path: &str, default: &str) -> Self {
        Self {
            path: path.to_string(),
            default: default.to_string(),
            env_var: env_var_for(path),
        }
    }
}

/// A named group of configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub name: String,
    pub keys: Vec<ConfigKey>,
}

impl Registration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    pub fn key(mut self, key: ConfigKey) -> Self {
        self.keys.push(key);
        self
    }
}

/// The `Global` registration: host, service and log level.
pub fn global_registration() -> Registration {
    Registration::new("Global")
        .key(ConfigKey::new(keys::HOST, ""))
        .key(ConfigKey::new(keys::SERVICE, ""))
        .key(ConfigKey::new(keys::LOG_LEVEL, "warn"))
}

/// Point the store at the global and user config directories and register
/// the global schema.
///
/// Path problems are not reported here; they surface on the first load.
pub fn register_config<S: ConfigStore + ?Sized>(store: &mut S, paths: &PathConfig) {
    store.set_global_path(paths.etc_dir.clone());
    store.set_user_path(paths.user_dir.clone());
    store.register(global_registration());
}

/// `volctl.logLevel` → `VOLCTL_LOGLEVEL`.
fn env_var_for(path: &str) -> String {
    path.replace(['.', '-'], "_").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env::vars;

    #[test]
    fn test_global_registration_defaults() {
        let reg = global_registration();
        assert_eq!(reg.name, "Global");
        assert_eq!(reg.keys.len(), 3);

        let level = reg.keys.iter().find(|k| k.path == keys::LOG_LEVEL).unwrap();
        assert_eq!(level.default, "warn");
        assert_eq!(level.env_var, vars::EXPORTED_LOG_LEVEL);
    }

    #[test]
    fn test_env_var_derivation() {
        assert_eq!(env_var_for("volctl.host"), "VOLCTL_HOST");
        assert_eq!(env_var_for("storage.client-type"), "STORAGE_CLIENT_TYPE");
    }
}
