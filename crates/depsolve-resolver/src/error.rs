//! Errors that end the resolution of a single node.

use depsolve_core::node::{FailureKind, NodeFailure};
use depsolve_registry::FetchError;
use miette::Diagnostic;
use thiserror::Error;

/// Why one node could not be resolved.
///
/// These never propagate past the node that raised them; the engine records
/// them on the node as a [`NodeFailure`].
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("invalid version constraint `{constraint}`: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("no published version satisfies `{constraint}` ({available} versions published)")]
    NoCompatibleVersion { constraint: String, available: usize },

    #[error("registry fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::InvalidConstraint { .. } => FailureKind::InvalidConstraint,
            ResolveError::NoCompatibleVersion { .. } => FailureKind::NoCompatibleVersion,
            ResolveError::Fetch(_) => FailureKind::Fetch,
        }
    }

    pub fn to_failure(&self) -> NodeFailure {
        NodeFailure::new(self.kind(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_matches_variant() {
        let err = ResolveError::NoCompatibleVersion {
            constraint: "^9.0.0".to_string(),
            available: 3,
        };
        let failure = err.to_failure();
        assert_eq!(failure.kind, FailureKind::NoCompatibleVersion);
        assert!(failure.message.contains("^9.0.0"));

        let err = ResolveError::from(FetchError::NotFound {
            what: "package x".to_string(),
        });
        assert_eq!(err.kind(), FailureKind::Fetch);
        assert_eq!(err.to_string(), "registry fetch failed: package x not found in registry");
    }
}
