//! Filesystem locations resolved once at startup.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::env::{vars, Environment};

/// Name of the per-user configuration directory under `$HOME`.
pub const DOT_DIR_NAME: &str = ".volctl";

/// Config file name looked up in both the global and the user directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved filesystem locations. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConfig {
    /// Install prefix (`VOLCTL_HOME`, default `/`).
    pub prefix: PathBuf,
    /// Global configuration directory.
    pub etc_dir: PathBuf,
    /// User home directory.
    pub home: PathBuf,
    /// Per-user configuration directory.
    pub user_dir: PathBuf,
    /// Trust store of accepted remote host keys.
    pub user_known_hosts: PathBuf,
}

impl PathConfig {
    /// Resolve every path from the environment snapshot.
    pub fn resolve(env: &Environment) -> Self {
        let prefix = env
            .non_empty(vars::INSTALL_PREFIX)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));

        let home = env
            .non_empty(vars::HOME)
            .or_else(|| env.non_empty(vars::USER_PROFILE))
            .map(PathBuf::from)
            .unwrap_or_else(|| prefix.clone());

        let etc_dir = prefix.join("etc").join("volctl");
        let user_dir = home.join(DOT_DIR_NAME);
        let user_known_hosts = user_dir.join("tls").join("known_hosts");

        Self {
            prefix,
            etc_dir,
            home,
            user_dir,
            user_known_hosts,
        }
    }

    /// Config file inside a config directory.
    pub fn config_file(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }
}
