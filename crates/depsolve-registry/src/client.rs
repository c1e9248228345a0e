use async_trait::async_trait;
use depsolve_core::metadata::{RegistryManifest, RegistryMetadata};

use crate::error::FetchError;

/// The two registry reads resolution depends on.
///
/// Implementations must be safe to call from many tasks at once; the
/// resolver bounds how many calls are in flight.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Every version currently published for `name`.
    async fn get_metadata(&self, name: &str) -> Result<RegistryMetadata, FetchError>;

    /// The dependency constraints declared by `name@version`.
    async fn get_manifest(&self, name: &str, version: &str)
        -> Result<RegistryManifest, FetchError>;
}
