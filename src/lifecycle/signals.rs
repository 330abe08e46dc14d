//! OS signal handling.
//!
//! # Responsibilities
//! - Install handlers for termination-class signals (SIGINT, SIGTERM, SIGQUIT, SIGHUP)
//! - Translate the first one received into an [`ExitSignal`]
//! - Arm a watcher task that runs the shutdown teardown when it fires
//!
//! # Design Decisions
//! - Handlers are installed before the watcher is spawned, so a signal
//!   arriving early is not lost
//! - A handler that cannot be installed is logged and skipped

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::ShutdownCoordinator;

/// A termination-class signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitSignal {
    Hangup,
    Interrupt,
    Quit,
    Terminate,
}

impl ExitSignal {
    pub const fn number(self) -> i32 {
        match self {
            ExitSignal::Hangup => 1,
            ExitSignal::Interrupt => 2,
            ExitSignal::Quit => 3,
            ExitSignal::Terminate => 15,
        }
    }

    /// Conventional shell exit status for a process ended by this signal.
    pub const fn exit_code(self) -> i32 {
        128 + self.number()
    }
}

impl fmt::Display for ExitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExitSignal::Hangup => "SIGHUP",
            ExitSignal::Interrupt => "SIGINT",
            ExitSignal::Quit => "SIGQUIT",
            ExitSignal::Terminate => "SIGTERM",
        })
    }
}

/// Installed termination signal handlers.
pub struct ExitSignals {
    #[cfg(unix)]
    streams: Vec<(ExitSignal, tokio::signal::unix::Signal)>,
}

impl ExitSignals {
    /// Install the handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let kinds = [
            (ExitSignal::Hangup, SignalKind::hangup()),
            (ExitSignal::Interrupt, SignalKind::interrupt()),
            (ExitSignal::Quit, SignalKind::quit()),
            (ExitSignal::Terminate, SignalKind::terminate()),
        ];

        let streams = kinds
            .into_iter()
            .filter_map(|(exit, kind)| match signal(kind) {
                Ok(stream) => Some((exit, stream)),
                Err(err) => {
                    tracing::warn!(signal = %exit, ?err, "failed to install signal handler");
                    None
                }
            })
            .collect();

        Self { streams }
    }

    #[cfg(not(unix))]
    pub fn install() -> Self {
        Self {}
    }

    /// Wait for the first termination signal.
    #[cfg(unix)]
    pub async fn recv(mut self) -> ExitSignal {
        use std::future::poll_fn;
        use std::task::Poll;

        if self.streams.is_empty() {
            return std::future::pending().await;
        }

        poll_fn(|cx| {
            for (exit, stream) in self.streams.iter_mut() {
                if let Poll::Ready(Some(())) = stream.poll_recv(cx) {
                    return Poll::Ready(*exit);
                }
            }
            Poll::Pending
        })
        .await
    }

    #[cfg(not(unix))]
    pub async fn recv(self) -> ExitSignal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ExitSignal::Interrupt,
            Err(err) => {
                tracing::warn!(?err, "failed to install Ctrl+C handler");
                std::future::pending().await
            }
        }
    }
}

/// Background task running the teardown when an exit signal arrives.
pub struct SignalWatcher;

impl SignalWatcher {
    /// Spawn the watcher. The task resolves to the signal received, after
    /// the teardown has completed.
    pub fn arm<F>(signal: F, shutdown: Arc<ShutdownCoordinator>) -> JoinHandle<ExitSignal>
    where
        F: Future<Output = ExitSignal> + Send + 'static,
    {
        tokio::spawn(async move {
            let received = signal.await;
            tracing::info!(signal = %received, "received exit signal");
            shutdown.trigger_once().await;
            received
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::SessionStack;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitSignal::Interrupt.exit_code(), 130);
        assert_eq!(ExitSignal::Terminate.exit_code(), 143);
        assert_eq!(ExitSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn test_watcher_runs_teardown() {
        let shutdown = Arc::new(ShutdownCoordinator::new(Arc::new(SessionStack::new())));
        let (tx, rx) = tokio::sync::oneshot::channel::<ExitSignal>();

        let watcher = SignalWatcher::arm(
            async move { rx.await.unwrap_or(ExitSignal::Terminate) },
            shutdown.clone(),
        );
        assert!(!shutdown.is_triggered());

        tx.send(ExitSignal::Interrupt).unwrap();
        assert_eq!(watcher.await.unwrap(), ExitSignal::Interrupt);
        assert_eq!(shutdown.runs(), 1);
        assert!(shutdown.is_complete());
    }
}
