//! Shared utilities for depsolve.
//!
//! This crate provides the cross-cutting concerns used by the other crates:
//! the unified error type and terminal status indicators.

pub mod errors;
pub mod progress;
