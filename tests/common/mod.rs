//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use volctl::config::env::vars;
use volctl::config::{Environment, FileConfigStore};
use volctl::lifecycle::{prepare, AppContext, Lifecycle};
use volctl::observability::logging::{build, LogFormat};

/// A throwaway install prefix and home directory.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn prefix(&self) -> PathBuf {
        self.dir.path().join("prefix")
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Environment pointing `VOLCTL_HOME` and `HOME` into the sandbox.
    pub fn env(&self) -> Environment {
        Environment::default()
            .with(vars::INSTALL_PREFIX, self.prefix().to_string_lossy())
            .with(vars::HOME, self.home().to_string_lossy())
    }

    pub fn write_global_config(&self, content: &str) {
        write_file(&self.prefix().join("etc").join("volctl").join("config.toml"), content);
    }

    pub fn write_user_config(&self, content: &str) {
        write_file(&self.home().join(".volctl").join("config.toml"), content);
    }

    pub fn known_hosts(&self) -> PathBuf {
        self.home().join(".volctl").join("tls").join("known_hosts")
    }
}

pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Prepare a lifecycle for `env`. Keep the subscriber alive for the test.
pub fn new_lifecycle(
    env: Environment,
) -> (Lifecycle, impl tracing::Subscriber + Send + Sync + 'static) {
    let ctx = prepare(env, &mut FileConfigStore::new(), Vec::new()).unwrap();
    let (subscriber, log) = build(ctx.verbosity(), LogFormat::Pretty);
    (Lifecycle::new(ctx, log), subscriber)
}

/// Dispatcher that blocks until released, reporting when it started.
pub struct GatedDispatcher {
    started: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
    status: u8,
}

pub struct Gate {
    pub started: tokio::sync::oneshot::Receiver<()>,
    pub release: mpsc::Sender<()>,
}

pub fn gated_dispatcher(status: u8) -> (GatedDispatcher, Gate) {
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        GatedDispatcher {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
            status,
        },
        Gate {
            started: started_rx,
            release: release_tx,
        },
    )
}

impl volctl::lifecycle::Dispatcher for GatedDispatcher {
    fn execute(&self, _ctx: &AppContext) -> u8 {
        if let Some(tx) = self.started.lock().unwrap().take() {
            let _ = tx.send(());
        }
        let _ = self.release.lock().unwrap().recv();
        self.status
    }
}

/// Keep a core busy so a running CPU profile collects samples.
pub fn burn_cpu(duration: Duration) -> u64 {
    let deadline = Instant::now() + duration;
    let mut acc = 0u64;
    while Instant::now() < deadline {
        for i in 0..10_000u64 {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
    }
    acc
}
