//! CPU profiling.
//!
//! Sampling profiler backed by `pprof`. The session writes a flamegraph
//! (SVG) of all samples taken between start and stop. Only one profiler can
//! run per process; a second start fails.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagnostics::session::{DiagnosticSession, DiagnosticsError, SessionKind};

/// Default sampling frequency in Hz.
pub const DEFAULT_FREQUENCY: i32 = 100;

#[cfg(unix)]
const BLOCKLIST: &[&str] = &["libc", "libgcc", "pthread", "vdso"];

fn start_err(reason: impl ToString) -> DiagnosticsError {
    DiagnosticsError::Start {
        kind: SessionKind::CpuProfile,
        reason: reason.to_string(),
    }
}

fn stop_err(reason: impl ToString) -> DiagnosticsError {
    DiagnosticsError::Stop {
        kind: SessionKind::CpuProfile,
        reason: reason.to_string(),
    }
}

pub struct CpuProfileSession {
    path: PathBuf,
    file: File,
    #[cfg(unix)]
    guard: pprof::ProfilerGuard<'static>,
}

impl CpuProfileSession {
    /// Create the output file and start sampling at `frequency` Hz.
    #[cfg(unix)]
    pub fn start(path: &Path, frequency: i32) -> Result<Self, DiagnosticsError> {
        let file = create_output(path)?;
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(frequency)
            .blocklist(BLOCKLIST)
            .build()
            .map_err(start_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            guard,
        })
    }

    #[cfg(not(unix))]
    pub fn start(path: &Path, _frequency: i32) -> Result<Self, DiagnosticsError> {
        let _ = create_output(path)?;
        Err(DiagnosticsError::Unsupported(SessionKind::CpuProfile))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSession for CpuProfileSession {
    fn kind(&self) -> SessionKind {
        SessionKind::CpuProfile
    }

    #[cfg(unix)]
    fn stop(self: Box<Self>) -> Result<(), DiagnosticsError> {
        let Self {
            path,
            mut file,
            guard,
        } = *self;

        let report = guard.report().build().map_err(stop_err)?;
        drop(guard);

        report
            .flamegraph(&mut file)
            .map_err(|e| stop_err(format!("{}: {e}", path.display())))?;
        file.sync_all()
            .map_err(|e| stop_err(format!("{}: {e}", path.display())))
    }

    #[cfg(not(unix))]
    fn stop(self: Box<Self>) -> Result<(), DiagnosticsError> {
        self.file.sync_all().map_err(stop_err)
    }
}

/// Profile the whole process for `duration` and return a flamegraph SVG.
///
/// Blocks the calling thread for `duration`.
#[cfg(unix)]
pub fn capture_flamegraph(duration: Duration, frequency: i32) -> Result<Vec<u8>, DiagnosticsError> {
    let guard = pprof::ProfilerGuardBuilder::default()
        .frequency(frequency)
        .blocklist(BLOCKLIST)
        .build()
        .map_err(start_err)?;

    std::thread::sleep(duration);

    let report = guard.report().build().map_err(stop_err)?;
    drop(guard);

    let mut svg = Vec::new();
    report.flamegraph(&mut svg).map_err(stop_err)?;
    Ok(svg)
}

#[cfg(not(unix))]
pub fn capture_flamegraph(
    _duration: Duration,
    _frequency: i32,
) -> Result<Vec<u8>, DiagnosticsError> {
    Err(DiagnosticsError::Unsupported(SessionKind::CpuProfile))
}

fn create_output(path: &Path) -> Result<File, DiagnosticsError> {
    File::create(path).map_err(|e| DiagnosticsError::CreateOutput {
        kind: SessionKind::CpuProfile,
        path: path.to_path_buf(),
        source: e,
    })
}

/// Serializes tests that start the process-wide profiler.
#[cfg(all(test, unix))]
pub(crate) static PROFILER_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Keep a core busy so the profiler has samples to report.
#[cfg(all(test, unix))]
pub(crate) fn burn_cpu(duration: Duration) -> u64 {
    let deadline = std::time::Instant::now() + duration;
    let mut acc = 0u64;
    while std::time::Instant::now() < deadline {
        for i in 0..10_000u64 {
            acc = std::hint::black_box(acc.wrapping_mul(31).wrapping_add(i));
        }
    }
    acc
}
