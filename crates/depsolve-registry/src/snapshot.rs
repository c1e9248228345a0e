//! Offline registry backed by an in-memory snapshot.
//!
//! A snapshot file maps package name to version to declared dependencies:
//!
//! ```json
//! {
//!   "app":  { "1.0.0": { "util": "^2.0.0" } },
//!   "util": { "2.0.0": {}, "2.1.0": {} }
//! }
//! ```
//!
//! Every read is counted, which makes the snapshot useful for checking how
//! many registry requests a resolution performs.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use depsolve_core::metadata::{RegistryManifest, RegistryMetadata};
use depsolve_util::errors::DepsolveError;

use crate::client::RegistryClient;
use crate::error::FetchError;

type Snapshot = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// Registry client answering from a fixed snapshot.
#[derive(Debug, Default)]
pub struct SnapshotRegistry {
    packages: Snapshot,
    unavailable: HashSet<String>,
    latency: Option<Duration>,
    metadata_fetches: AtomicUsize,
    manifest_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot document.
    pub fn from_json(json: &str) -> miette::Result<Self> {
        let packages: Snapshot = serde_json::from_str(json).map_err(|e| DepsolveError::Config {
            message: format!("Invalid registry snapshot: {e}"),
        })?;
        Ok(Self {
            packages,
            ..Self::default()
        })
    }

    /// Load a snapshot file from disk.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DepsolveError::Config {
            message: format!("Failed to read snapshot {}: {e}", path.display()),
        })?;
        Self::from_json(&content)
    }

    /// Add one published version with its declared dependencies.
    pub fn publish(mut self, name: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        let deps = dependencies
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();
        self.packages
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), deps);
        self
    }

    /// Make every read for `name` fail as if the registry were unreachable.
    pub fn unavailable(mut self, name: &str) -> Self {
        self.unavailable.insert(name.to_string());
        self
    }

    /// Delay every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn metadata_fetches(&self) -> usize {
        self.metadata_fetches.load(Ordering::SeqCst)
    }

    pub fn manifest_fetches(&self) -> usize {
        self.manifest_fetches.load(Ordering::SeqCst)
    }

    /// Metadata plus manifest reads so far.
    pub fn total_fetches(&self) -> usize {
        self.metadata_fetches() + self.manifest_fetches()
    }

    /// Highest number of reads that were in progress at the same moment.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, name: &str) -> Result<InFlight<'_>, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.contains(name) {
            return Err(FetchError::Transport {
                url: format!("snapshot://{name}"),
                message: "registry unavailable".to_string(),
            });
        }
        Ok(guard)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryClient for SnapshotRegistry {
    async fn get_metadata(&self, name: &str) -> Result<RegistryMetadata, FetchError> {
        self.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter(name).await?;
        let versions = self
            .packages
            .get(name)
            .ok_or_else(|| FetchError::NotFound {
                what: format!("package {name}"),
            })?;
        Ok(RegistryMetadata::from_raw(
            name,
            versions.keys().map(String::as_str),
        ))
    }

    async fn get_manifest(
        &self,
        name: &str,
        version: &str,
    ) -> Result<RegistryManifest, FetchError> {
        self.manifest_fetches.fetch_add(1, Ordering::SeqCst);
        let _guard = self.enter(name).await?;
        let dependencies = self
            .packages
            .get(name)
            .and_then(|versions| versions.get(version))
            .ok_or_else(|| FetchError::NotFound {
                what: format!("{name}@{version}"),
            })?;
        Ok(RegistryManifest {
            name: name.to_string(),
            version: version.to_string(),
            dependencies: dependencies.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_published_versions() {
        let registry = SnapshotRegistry::new()
            .publish("a", "1.0.0", &[("b", "^2.0.0")])
            .publish("a", "1.1.0", &[]);
        let meta = registry.get_metadata("a").await.unwrap();
        assert_eq!(meta.versions.len(), 2);

        let manifest = registry.get_manifest("a", "1.0.0").await.unwrap();
        assert_eq!(manifest.dependencies.get("b").map(String::as_str), Some("^2.0.0"));
        assert_eq!(registry.total_fetches(), 2);
    }

    #[tokio::test]
    async fn missing_package_is_not_found() {
        let registry = SnapshotRegistry::new();
        let err = registry.get_metadata("ghost").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert_eq!(registry.metadata_fetches(), 1);
    }

    #[tokio::test]
    async fn unavailable_package_fails_transport() {
        let registry = SnapshotRegistry::new()
            .publish("a", "1.0.0", &[])
            .unavailable("a");
        let err = registry.get_metadata("a").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(registry.max_in_flight(), 1);
    }

    #[test]
    fn parses_snapshot_json() {
        let registry = SnapshotRegistry::from_json(
            r#"{ "app": { "1.0.0": { "util": "^2.0.0" } }, "util": { "2.0.0": {} } }"#,
        )
        .unwrap();
        assert_eq!(registry.packages.len(), 2);
    }

    #[test]
    fn rejects_malformed_snapshot() {
        let err = SnapshotRegistry::from_json("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("Invalid registry snapshot"));
    }
}
