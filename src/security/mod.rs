//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     PathConfig.user_known_hosts
//!     → known_hosts.rs (exists? no-op : mkdir -p + create empty 0600)
//!     → dispatcher may now verify remote hosts
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing trust store that cannot be created is fatal
//! - Never modify an existing trust store

pub mod known_hosts;

pub use known_hosts::{ensure_known_hosts, KnownHosts, TrustStoreError};
