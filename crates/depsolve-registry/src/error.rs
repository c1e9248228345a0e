use miette::Diagnostic;
use thiserror::Error;

/// A registry read that did not produce usable data.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    /// The request never produced a response (connect, TLS, timeout, body read).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The registry answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The registry base URL cannot carry a package path.
    #[error("invalid registry URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The package or version is not published.
    #[error("{what} not found in registry")]
    NotFound { what: String },
}

impl From<FetchError> for depsolve_util::errors::DepsolveError {
    fn from(e: FetchError) -> Self {
        depsolve_util::errors::DepsolveError::Network {
            message: e.to_string(),
        }
    }
}
