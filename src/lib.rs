//! Process lifecycle controller for the volctl storage CLI.
//!
//! Resolves configuration and verbosity once at startup, bootstraps the SSH
//! trust store, starts opt-in diagnostics, hands control to the command
//! dispatcher and tears everything down exactly once on exit.

pub mod config;
pub mod diagnostics;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{EffectiveConfig, Environment, FileConfigStore};
pub use lifecycle::{AppContext, Lifecycle, LifecycleError, Outcome};
pub use observability::Verbosity;
