use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all depsolve operations.
///
/// Per-node resolution failures never surface here; they are recorded on the
/// node itself. This type covers faults outside a single node's resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum DepsolveError {
    /// Invalid or unreadable configuration (e.g. `~/.depsolve/config.toml`).
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check ~/.depsolve/config.toml for syntax errors"))]
    Config { message: String },

    /// The requested package identity is not usable (e.g. empty).
    #[error("Invalid package: {message}")]
    InvalidPackage { message: String },

    /// Resolution could not produce a tree at all.
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Registry request or client construction failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The HTTP server could not bind or serve.
    #[error("Server error: {message}")]
    Server { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}
