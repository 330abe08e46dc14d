//! Diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! Environment snapshot
//!     → controller.rs (DiagnosticsConfig: which sessions were requested)
//!     → cpu.rs (VOLCTL_CPU_PROFILE: pprof sampling → flamegraph SVG)
//!     → trace.rs (VOLCTL_TRACE_PROFILE: JSON span/event timeline)
//!     → introspection.rs (VOLCTL_PROFILE_ADDR: detached HTTP endpoint)
//!
//! Shutdown:
//!     session.rs SessionStack::unwind → trace stop → cpu profile stop
//! ```
//!
//! # Design Decisions
//! - Opt-in only: nothing starts unless its variable is set
//! - Fail fast: any start failure is fatal, including an introspection bind
//! - Stop in reverse start order, exactly once
//! - Introspection is never stopped; it ends with the process

pub mod controller;
pub mod cpu;
pub mod introspection;
pub mod session;
pub mod trace;

pub use controller::{Diagnostics, DiagnosticsConfig};
pub use session::{DiagnosticSession, DiagnosticsError, SessionKind, SessionStack};
