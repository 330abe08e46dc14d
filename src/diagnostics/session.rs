//! Diagnostic session bookkeeping.
//!
//! Every started session is pushed onto a [`SessionStack`]. The stack is
//! unwound once, newest first, by the shutdown teardown. After that the
//! stack is closed and rejects new sessions so nothing started late can
//! escape being stopped.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;

/// Kind of diagnostic instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Trace,
    CpuProfile,
    Introspection,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionKind::Trace => "trace profile",
            SessionKind::CpuProfile => "cpu profile",
            SessionKind::Introspection => "introspection server",
        })
    }
}

#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("failed to create {kind} output {path}: {source}")]
    CreateOutput {
        kind: SessionKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start {kind}: {reason}")]
    Start { kind: SessionKind, reason: String },

    #[error("failed to stop {kind}: {reason}")]
    Stop { kind: SessionKind, reason: String },

    #[error("failed to bind introspection server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not supported on this platform")]
    Unsupported(SessionKind),

    #[error("{0} not started: shutdown already in progress")]
    ShuttingDown(SessionKind),
}

/// A started instrumentation session owning an open resource.
///
/// `stop` consumes the session, so a session can be stopped at most once.
pub trait DiagnosticSession: Send {
    fn kind(&self) -> SessionKind;

    fn stop(self: Box<Self>) -> Result<(), DiagnosticsError>;
}

#[derive(Default)]
struct StackState {
    sessions: Vec<Box<dyn DiagnosticSession>>,
    closed: bool,
}

/// Started sessions in start order.
#[derive(Default)]
pub struct SessionStack {
    state: Mutex<StackState>,
}

impl SessionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a started session.
    ///
    /// Once the stack was unwound the session is handed back to the caller,
    /// which must stop it.
    pub fn push(
        &self,
        session: Box<dyn DiagnosticSession>,
    ) -> Result<(), Box<dyn DiagnosticSession>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(session);
        }
        state.sessions.push(session);
        metrics::record_sessions(state.sessions.len());
        Ok(())
    }

    /// Kinds of the running sessions, in start order.
    pub fn active(&self) -> Vec<SessionKind> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sessions.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Close the stack and stop every session in reverse start order.
    ///
    /// Stop failures are logged. Returns the number of sessions stopped.
    pub fn unwind(&self) -> usize {
        let sessions = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.closed = true;
            std::mem::take(&mut state.sessions)
        };

        let count = sessions.len();
        for session in sessions.into_iter().rev() {
            let kind = session.kind();
            tracing::info!(session = %kind, "stopping {kind}");
            match session.stop() {
                Ok(()) => tracing::debug!(session = %kind, "stopped {kind}"),
                Err(e) => tracing::error!(session = %kind, error = %e, "failed to stop {kind}"),
            }
        }
        metrics::record_sessions(0);
        count
    }
}

impl fmt::Debug for SessionStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStack")
            .field("active", &self.active())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Session that appends its label to a shared log when stopped.
    pub(crate) struct RecordingSession {
        pub kind: SessionKind,
        pub label: &'static str,
        pub log: Arc<Mutex<Vec<&'static str>>>,
        pub fail: bool,
    }

    impl RecordingSession {
        pub(crate) fn boxed(
            kind: SessionKind,
            label: &'static str,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Box<dyn DiagnosticSession> {
            Box::new(Self {
                kind,
                label,
                log: log.clone(),
                fail: false,
            })
        }
    }

    impl DiagnosticSession for RecordingSession {
        fn kind(&self) -> SessionKind {
            self.kind
        }

        fn stop(self: Box<Self>) -> Result<(), DiagnosticsError> {
            self.log.lock().unwrap().push(self.label);
            if self.fail {
                return Err(DiagnosticsError::Stop {
                    kind: self.kind,
                    reason: "simulated".into(),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::testing::RecordingSession;
    use super::*;

    #[test]
    fn test_unwind_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = SessionStack::new();
        assert!(stack
            .push(RecordingSession::boxed(SessionKind::CpuProfile, "cpu", &log))
            .is_ok());
        assert!(stack
            .push(RecordingSession::boxed(SessionKind::Trace, "trace", &log))
            .is_ok());
        assert_eq!(stack.active(), vec![SessionKind::CpuProfile, SessionKind::Trace]);

        assert_eq!(stack.unwind(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["trace", "cpu"]);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_closed_stack_rejects_sessions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = SessionStack::new();
        assert_eq!(stack.unwind(), 0);
        assert!(stack.is_closed());

        let rejected = stack
            .push(RecordingSession::boxed(SessionKind::Trace, "late", &log))
            .err()
            .expect("closed stack must reject");
        assert_eq!(rejected.kind(), SessionKind::Trace);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_failure_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = SessionStack::new();
        let _ = stack.push(RecordingSession::boxed(SessionKind::CpuProfile, "cpu", &log));
        let _ = stack.push(Box::new(RecordingSession {
            kind: SessionKind::Trace,
            label: "trace",
            log: log.clone(),
            fail: true,
        }));

        assert_eq!(stack.unwind(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["trace", "cpu"]);
    }

    #[test]
    fn test_second_unwind_is_empty() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stack = SessionStack::new();
        let _ = stack.push(RecordingSession::boxed(SessionKind::Trace, "trace", &log));

        assert_eq!(stack.unwind(), 1);
        assert_eq!(stack.unwind(), 0);
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
