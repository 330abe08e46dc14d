//! Trust-store bootstrap.
//!
//! The secure-channel verifier records accepted host keys in a
//! `known_hosts` file and refuses to run without one. This makes sure the
//! file exists before the dispatcher runs.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("failed to create known_hosts directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create known_hosts {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What `ensure_known_hosts` found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownHosts {
    /// The file was already there and was left untouched.
    Existing,
    /// An empty file was created.
    Created,
}

/// Make sure the trust-store file exists.
pub fn ensure_known_hosts(path: &Path) -> Result<KnownHosts, TrustStoreError> {
    if path.exists() {
        return Ok(KnownHosts::Existing);
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir).map_err(|e| TrustStoreError::CreateDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    match options.open(path) {
        Ok(file) => {
            drop(file);
            tracing::debug!(path = %path.display(), "created known_hosts");
            Ok(KnownHosts::Created)
        }
        // Lost a race with another process creating the same file.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(KnownHosts::Existing),
        Err(e) => Err(TrustStoreError::CreateFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn create_dir_all(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder.create(dir)
}
