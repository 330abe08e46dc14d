//! Shutdown coordination.
//!
//! Two triggers can race to shut the process down: the signal watcher and
//! the main flow after the dispatcher returns. An atomic test-and-set picks
//! exactly one of them to run the teardown. The others wait for it to finish
//! so nobody exits while teardown is still writing profiles.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::diagnostics::SessionStack;
use crate::observability::metrics;

/// Coordinator for the one-time teardown.
pub struct ShutdownCoordinator {
    triggered: AtomicBool,
    runs: AtomicUsize,
    sessions: Arc<SessionStack>,
    done: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new(sessions: Arc<SessionStack>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            triggered: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
            sessions,
            done,
        }
    }

    /// Run the teardown if no one else has.
    ///
    /// Returns `true` for the caller that ran it. Every other caller waits
    /// until the teardown completed and gets `false`.
    pub async fn trigger_once(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.teardown();
            self.done.send_replace(true);
            return true;
        }

        let mut done = self.done.subscribe();
        // The sender lives in `self`, so this only ends once teardown is done.
        let _ = done.wait_for(|finished| *finished).await;
        false
    }

    /// Stop trace, then CPU profile, then log the final record.
    fn teardown(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let stopped = self.sessions.unwind();
        metrics::record_shutdown();
        tracing::info!(sessions_stopped = stopped, "exiting process");
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        *self.done.borrow()
    }

    /// Number of times the teardown body ran. Never more than one.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("triggered", &self.is_triggered())
            .field("complete", &self.is_complete())
            .field("runs", &self.runs())
            .finish()
    }
}
