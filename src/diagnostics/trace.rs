//! Execution trace session.
//!
//! Attaches a JSON layer to the logging reload slot. Every span open/close
//! and every event, at any level, is written to the trace file as one JSON
//! object per line, giving an execution timeline for later analysis.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::Layer;

use crate::diagnostics::session::{DiagnosticSession, DiagnosticsError, SessionKind};
use crate::observability::LogHandle;

pub struct TraceSession {
    path: PathBuf,
    file: Arc<File>,
    log: LogHandle,
}

impl TraceSession {
    /// Create the trace file and start recording into it.
    pub fn start(path: &Path, log: &LogHandle) -> Result<Self, DiagnosticsError> {
        let file = File::create(path).map_err(|e| DiagnosticsError::CreateOutput {
            kind: SessionKind::Trace,
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = Arc::new(file);

        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_thread_ids(true)
            .with_writer(file.clone())
            .boxed();

        log.attach_trace(layer)
            .map_err(|e| DiagnosticsError::Start {
                kind: SessionKind::Trace,
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            log: log.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSession for TraceSession {
    fn kind(&self) -> SessionKind {
        SessionKind::Trace
    }

    fn stop(self: Box<Self>) -> Result<(), DiagnosticsError> {
        let stop_err = |reason: String| DiagnosticsError::Stop {
            kind: SessionKind::Trace,
            reason,
        };

        self.log.detach_trace().map_err(|e| stop_err(e.to_string()))?;
        self.file
            .sync_all()
            .map_err(|e| stop_err(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::{build, LogFormat};
    use crate::observability::Verbosity;

    #[test]
    fn test_trace_records_spans_below_verbosity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");

        let (subscriber, log) = build(Verbosity::Error, LogFormat::Pretty);
        let _guard = tracing::subscriber::set_default(subscriber);

        let session = TraceSession::start(&path, &log).unwrap();
        assert!(log.trace_attached());

        tracing::info_span!("attach_volume", volume = "vol-1").in_scope(|| {
            tracing::debug!("mapping device");
        });

        Box::new(session).stop().unwrap();
        assert!(!log.trace_attached());

        tracing::info!("after stop");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("attach_volume"));
        assert!(content.contains("mapping device"));
        assert!(!content.contains("after stop"));
        for line in content.lines() {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.jsonl");
        let (_subscriber, log) = build(Verbosity::Warn, LogFormat::Pretty);

        let err = TraceSession::start(&path, &log).err().unwrap();
        assert!(matches!(err, DiagnosticsError::CreateOutput { kind: SessionKind::Trace, .. }));
        assert!(!log.trace_attached());
    }
}
