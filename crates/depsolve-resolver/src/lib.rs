//! Dependency resolution engine: npm range selection, concurrent recursive
//! tree construction with a per-request task group, cycle detection, and the
//! process-wide resolution cache.

pub mod cache;
pub mod constraint;
pub mod engine;
pub mod error;
pub mod graph;
pub mod range;
pub mod service;
