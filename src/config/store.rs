//! Configuration store: registered defaults, config files, env overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::effective::{ConfigSource, EffectiveConfig};
use crate::config::env::Environment;
use crate::config::paths::PathConfig;
use crate::config::registry::Registration;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The configuration store the lifecycle core registers its schema with.
pub trait ConfigStore {
    fn register(&mut self, registration: Registration);
    fn set_global_path(&mut self, path: PathBuf);
    fn set_user_path(&mut self, path: PathBuf);

    /// Build the effective configuration from every source.
    fn load(&self, env: &Environment) -> Result<EffectiveConfig, ConfigError>;
}

/// TOML-backed store reading `config.toml` from the global and user dirs.
#[derive(Debug, Default)]
pub struct FileConfigStore {
    registrations: Vec<Registration>,
    global_path: Option<PathBuf>,
    user_path: Option<PathBuf>,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

impl ConfigStore for FileConfigStore {
    fn register(&mut self, registration: Registration) {
        self.registrations.push(registration);
    }

    fn set_global_path(&mut self, path: PathBuf) {
        self.global_path = Some(path);
    }

    fn set_user_path(&mut self, path: PathBuf) {
        self.user_path = Some(path);
    }

    fn load(&self, env: &Environment) -> Result<EffectiveConfig, ConfigError> {
        let mut config = EffectiveConfig::new();

        for key in self.registrations.iter().flat_map(|r| &r.keys) {
            config.set(ConfigSource::Default, &key.path, key.default.clone());
        }

        if let Some(dir) = &self.global_path {
            load_file(&PathConfig::config_file(dir), ConfigSource::GlobalFile, &mut config)?;
        }
        if let Some(dir) = &self.user_path {
            load_file(&PathConfig::config_file(dir), ConfigSource::UserFile, &mut config)?;
        }

        for key in self.registrations.iter().flat_map(|r| &r.keys) {
            if let Some(value) = env.non_empty(&key.env_var) {
                config.set(ConfigSource::Environment, &key.path, value);
            }
        }

        Ok(config)
    }
}

/// Merge a TOML file into `config`. A missing file is skipped.
pub fn load_file(
    path: &Path,
    source: ConfigSource,
    config: &mut EffectiveConfig,
) -> Result<bool, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    flatten("", &table, source, config);
    tracing::trace!(path = %path.display(), ?source, "config file merged");
    Ok(true)
}

fn flatten(prefix: &str, table: &toml::Table, source: ConfigSource, config: &mut EffectiveConfig) {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(&path, inner, source, config),
            toml::Value::String(s) => {
                config.set(source, &path, s.clone());
            }
            other => {
                config.set(source, &path, other.to_string());
            }
        }
    }
}
