//! Startup orchestration.
//!
//! # Responsibilities
//! - Register the config schema and load the effective configuration
//! - Resolve the verbosity
//! - Ensure the trust store exists
//! - Arm the signal watcher, start diagnostics, hand over to the dispatcher
//! - Run the shutdown teardown exactly once, whichever trigger comes first
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Steps run in order, not concurrently
//! - The dispatcher is not waited for once a signal has been handled

use std::sync::Arc;

use thiserror::Error;

use crate::config::{
    register_config, ConfigError, ConfigSource, ConfigStore, Environment, PathConfig,
};
use crate::diagnostics::{Diagnostics, DiagnosticsConfig, DiagnosticsError, SessionStack};
use crate::lifecycle::context::AppContext;
use crate::lifecycle::dispatcher::{Dispatcher, Outcome};
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::{ExitSignal, SignalWatcher};
use crate::observability::{self, LogHandle, LoggingError};
use crate::security::{ensure_known_hosts, KnownHosts, TrustStoreError};

/// Exit status reported when the dispatcher panicked.
const EXIT_PANIC: u8 = 101;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    TrustStore(#[from] TrustStoreError),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error("signal watcher failed: {0}")]
    Watcher(#[from] tokio::task::JoinError),
}

/// Register configuration, load it, apply flag overrides and resolve the
/// verbosity.
///
/// Nothing is logged here; the subscriber is installed afterwards at the
/// resolved level.
pub fn prepare<S, I>(
    env: Environment,
    store: &mut S,
    overrides: I,
) -> Result<AppContext, LifecycleError>
where
    S: ConfigStore + ?Sized,
    I: IntoIterator<Item = (String, String)>,
{
    let paths = PathConfig::resolve(&env);
    register_config(store, &paths);

    let mut config = store.load(&env)?;
    for (key, value) in overrides {
        config.set(ConfigSource::Flag, &key, value);
    }

    let resolution = observability::resolve(&env, config.log_level());
    Ok(AppContext::new(env, config, paths, resolution))
}

/// Owns the pieces shared between the main flow and the signal watcher.
pub struct Lifecycle {
    ctx: Arc<AppContext>,
    log: LogHandle,
    sessions: Arc<SessionStack>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl Lifecycle {
    pub fn new(ctx: AppContext, log: LogHandle) -> Self {
        let sessions = Arc::new(SessionStack::new());
        let shutdown = Arc::new(ShutdownCoordinator::new(sessions.clone()));
        Self {
            ctx: Arc::new(ctx),
            log,
            sessions,
            shutdown,
        }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Bootstrap the trust store, arm `exit_signal`, start diagnostics and
    /// run `dispatcher` to completion or until the signal fires.
    pub async fn run<D, F>(
        &self,
        exit_signal: F,
        dispatcher: D,
    ) -> Result<Outcome, LifecycleError>
    where
        D: Dispatcher,
        F: std::future::Future<Output = ExitSignal> + Send + 'static,
    {
        let ctx = &self.ctx;
        tracing::debug!(run_id = %ctx.run_id, level = %ctx.verbosity(), "starting");

        let known_hosts = &ctx.paths.user_known_hosts;
        if ensure_known_hosts(known_hosts)? == KnownHosts::Created {
            tracing::info!(path = %known_hosts.display(), "created known_hosts");
        }

        let mut watcher = SignalWatcher::arm(exit_signal, self.shutdown.clone());
        tracing::debug!("trapped signals");

        let config = DiagnosticsConfig::from_env(&ctx.env);
        let diagnostics = match Diagnostics::start(&config, &self.log, &self.sessions, ctx).await {
            Ok(diagnostics) => diagnostics,
            Err(DiagnosticsError::ShuttingDown(kind)) => {
                tracing::debug!(session = %kind, "diagnostics start interrupted by shutdown");
                return Ok(Outcome::Interrupted(watcher.await?));
            }
            Err(e) => {
                watcher.abort();
                return Err(e.into());
            }
        };
        if let Some(server) = diagnostics.introspection() {
            tracing::debug!(address = %server.local_addr(), "introspection running");
        }

        if self.shutdown.is_triggered() {
            tracing::debug!("shutdown already triggered, skipping dispatch");
            return Ok(Outcome::Interrupted(watcher.await?));
        }

        let dispatch_ctx = ctx.clone();
        let mut dispatch = tokio::task::spawn_blocking(move || dispatcher.execute(&dispatch_ctx));

        tokio::select! {
            biased;

            received = &mut watcher => match received {
                Ok(signal) => Ok(Outcome::Interrupted(signal)),
                Err(e) => {
                    tracing::warn!(error = %e, "signal watcher failed, waiting for dispatcher");
                    let code = dispatch_status(dispatch.await);
                    self.shutdown.trigger_once().await;
                    Ok(Outcome::Completed(code))
                }
            },
            joined = &mut dispatch => {
                let code = dispatch_status(joined);
                tracing::debug!(code, "completed cli execution");
                if !self.shutdown.trigger_once().await {
                    // The watcher ran the teardown; report its signal.
                    return Ok(Outcome::Interrupted(watcher.await?));
                }
                watcher.abort();
                tracing::debug!("completed shutdown at end of program");
                Ok(Outcome::Completed(code))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &Arc<SessionStack> {
        &self.sessions
    }
}

fn dispatch_status(joined: Result<u8, tokio::task::JoinError>) -> u8 {
    match joined {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "dispatcher failed");
            EXIT_PANIC
        }
    }
}
