//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Environment snapshot + effective config
//!     → verbosity.rs (resolve one level, record rejected inputs)
//!     → logging.rs (install subscriber at that level)
//!     → Resolution::exports() (same level handed to collaborators)
//!
//! Diagnostics:
//!     → trace session attaches a JSON file layer to the logging reload slot
//!     → metrics.rs (session gauge, shutdown counter, Prometheus render)
//! ```
//!
//! # Design Decisions
//! - Resolve once, propagate via AppContext instead of mutating the environment
//! - Debug toggles beat explicit levels
//! - Unparseable levels fall through but are reported

pub mod logging;
pub mod metrics;
pub mod verbosity;

pub use logging::{LogFormat, LogHandle, LoggingError};
pub use verbosity::{resolve, LevelSource, Resolution, Verbosity};
