//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     prepare: register config → load → flag overrides → resolve level
//!     run: known_hosts → arm signal watcher → diagnostics → dispatcher
//!
//! Shutdown (shutdown.rs):
//!     dispatcher returned ─┐
//!                          ├→ trigger_once → stop trace → stop cpu → "exiting process"
//!     exit signal ─────────┘
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT/SIGHUP → teardown → exit 128+signo
//! ```
//!
//! # Design Decisions
//! - Ordered startup, fail fast on any error
//! - Teardown runs exactly once, however many triggers race
//! - The context is built once and passed explicitly, never stored globally

pub mod context;
pub mod dispatcher;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use context::AppContext;
pub use dispatcher::{Dispatcher, Outcome};
pub use shutdown::ShutdownCoordinator;
pub use signals::{ExitSignal, ExitSignals, SignalWatcher};
pub use startup::{prepare, Lifecycle, LifecycleError};
