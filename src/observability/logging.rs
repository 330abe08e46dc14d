//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide `tracing` subscriber at the resolved verbosity
//! - Stderr output, pretty or JSON (`VOLCTL_LOG_FORMAT`)
//! - Provide a reload slot the trace session attaches its file layer to
//!
//! # Design Decisions
//! - The verbosity filter applies to stderr only; the trace slot is unfiltered
//! - The level is fixed for the run; there is no runtime setter

use thiserror::Error;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::env::{vars, Environment};
use crate::observability::verbosity::Verbosity;

/// A boxed layer stacked directly on the registry.
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

type TraceSlot = Option<BoxedLayer>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install global subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("trace layer already attached")]
    TraceAttached,

    #[error("failed to reload trace layer: {0}")]
    Reload(#[from] reload::Error),
}

/// Stderr log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env(env: &Environment) -> Self {
        match env.non_empty(vars::LOG_FORMAT) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Handle to the installed subscriber's trace slot.
#[derive(Clone)]
pub struct LogHandle {
    trace: reload::Handle<TraceSlot, Registry>,
}

impl LogHandle {
    /// Attach a layer receiving every span and event regardless of verbosity.
    pub fn attach_trace(&self, layer: BoxedLayer) -> Result<(), LoggingError> {
        if self.trace_attached() {
            return Err(LoggingError::TraceAttached);
        }
        self.trace.reload(Some(layer))?;
        Ok(())
    }

    /// Remove the trace layer, dropping its writer.
    pub fn detach_trace(&self) -> Result<(), LoggingError> {
        self.trace.reload(None)?;
        Ok(())
    }

    pub fn trace_attached(&self) -> bool {
        self.trace
            .with_current(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("trace_attached", &self.trace_attached())
            .finish()
    }
}

/// Build the subscriber without installing it.
pub fn build(
    verbosity: Verbosity,
    format: LogFormat,
) -> (impl tracing::Subscriber + Send + Sync + 'static, LogHandle) {
    let (trace_layer, trace) = reload::Layer::new(None::<BoxedLayer>);

    let stderr = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(trace_layer)
        .with(stderr.with_filter(EnvFilter::new(verbosity.as_str())));

    (subscriber, LogHandle { trace })
}

/// Install the process-wide subscriber.
pub fn init(verbosity: Verbosity, format: LogFormat) -> Result<LogHandle, LoggingError> {
    let (subscriber, handle) = build(verbosity, format);
    subscriber.try_init()?;
    Ok(handle)
}
