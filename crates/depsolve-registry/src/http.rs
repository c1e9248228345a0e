//! npm-compatible registry client over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use depsolve_core::config::RegistryConfig;
use depsolve_core::metadata::{RegistryManifest, RegistryMetadata};
use depsolve_util::errors::DepsolveError;
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;

use crate::client::RegistryClient;
use crate::error::FetchError;
use crate::repository::Registry;

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Full package document; only the version keys are needed.
#[derive(Debug, Deserialize)]
struct PackumentResponse {
    #[serde(default)]
    versions: BTreeMap<String, IgnoredAny>,
}

/// Per-version document.
#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, String>>,
}

/// Build a shared reqwest client for registry reads.
pub fn build_client(timeout: Duration) -> miette::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("depsolve/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            DepsolveError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Registry client reading an npm-compatible JSON API.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    client: Client,
    registry: Registry,
    retries: u32,
}

impl HttpRegistry {
    pub fn new(client: Client, registry: Registry) -> Self {
        Self {
            client,
            registry,
            retries: 0,
        }
    }

    /// Build a client from the `[registry]` configuration section.
    pub fn from_config(config: &RegistryConfig) -> miette::Result<Self> {
        let client = build_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(client, Registry::from_config(config)).with_retries(config.retries))
    }

    /// Re-attempt connect, timeout and 5xx failures up to `retries` extra times.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// GET `url` and decode the body as JSON.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let mut last_err = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAY * attempt).await;
                tracing::debug!("retrying {url} (attempt {})", attempt + 1);
            }

            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = Some(FetchError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
            };

            let status = resp.status();
            if status.is_server_error() {
                last_err = Some(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
                continue;
            }
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = resp.bytes().await.map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: format!("failed to read body: {e}"),
            })?;
            return serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            });
        }

        Err(last_err.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            message: "no attempt was made".to_string(),
        }))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistry {
    async fn get_metadata(&self, name: &str) -> Result<RegistryMetadata, FetchError> {
        let url = self.registry.metadata_url(name)?;
        tracing::debug!("fetching metadata {url}");
        let doc: PackumentResponse = self.get_json(url.as_str()).await?;
        Ok(RegistryMetadata::from_raw(
            name,
            doc.versions.keys().map(String::as_str),
        ))
    }

    async fn get_manifest(
        &self,
        name: &str,
        version: &str,
    ) -> Result<RegistryManifest, FetchError> {
        let url = self.registry.manifest_url(name, version)?;
        tracing::debug!("fetching manifest {url}");
        let doc: VersionResponse = self.get_json(url.as_str()).await?;
        Ok(RegistryManifest {
            name: if doc.name.is_empty() {
                name.to_string()
            } else {
                doc.name
            },
            version: if doc.version.is_empty() {
                version.to_string()
            } else {
                doc.version
            },
            dependencies: doc.dependencies.unwrap_or_default(),
        })
    }
}
