//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment
//!     → env.rs (snapshot, read once)
//!     → paths.rs (PathConfig: etc dir, user dir, known_hosts)
//!
//! registry.rs (schema + defaults)
//!     → store.rs (ConfigStore: defaults → global file → user file → env)
//!     → effective.rs (EffectiveConfig, case-insensitive, per-key source)
//!     → CLI flags applied on top
//!     → shared via AppContext to all subsystems
//! ```
//!
//! # Design Decisions
//! - Registration runs before anything reads configuration
//! - Path problems are deferred to the first load
//! - Config is immutable once the context is built

pub mod effective;
pub mod env;
pub mod paths;
pub mod registry;
pub mod store;

pub use effective::{ConfigSource, EffectiveConfig};
pub use env::Environment;
pub use paths::PathConfig;
pub use registry::{register_config, Registration};
pub use store::{ConfigError, ConfigStore, FileConfigStore};
