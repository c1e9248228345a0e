//! Core data types for depsolve.
//!
//! This crate defines the resolved dependency tree, the registry data the
//! resolver consumes, and the global configuration. It is intentionally free
//! of async code and network I/O.

/// Default registry origin used when no configuration overrides it.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

pub mod config;
pub mod metadata;
pub mod node;
