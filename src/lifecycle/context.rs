//! Explicit application context handed to every collaborator.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::{EffectiveConfig, Environment, PathConfig};
use crate::observability::{Resolution, Verbosity};

/// Everything resolved during startup. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub run_id: Uuid,
    pub env: Environment,
    pub config: EffectiveConfig,
    pub paths: PathConfig,
    pub resolution: Resolution,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(
        env: Environment,
        config: EffectiveConfig,
        paths: PathConfig,
        resolution: Resolution,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            env,
            config,
            paths,
            resolution,
            started_at: Instant::now(),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.resolution.level
    }

    pub fn debug_mode(&self) -> bool {
        self.resolution.debug_mode
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Environment to hand to subprocesses so they observe the resolved level.
    ///
    /// ```no_run
    /// # fn demo(ctx: &volctl::lifecycle::AppContext) -> std::io::Result<()> {
    /// std::process::Command::new("storage-agent")
    ///     .envs(ctx.child_env())
    ///     .status()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn child_env(&self) -> impl Iterator<Item = (&'static str, String)> {
        self.resolution.exports().into_iter()
    }
}
