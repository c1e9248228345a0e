use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use depsolve_util::errors::DepsolveError;

/// Global user configuration loaded from `~/.depsolve/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Registry origin and transport settings from `[registry]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,
    /// Extra attempts for connect/timeout/5xx failures. `0` disables retries.
    #[serde(default)]
    pub retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

fn default_registry_url() -> String {
    crate::DEFAULT_REGISTRY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Resolution engine and cache settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(
        default = "default_max_concurrent_fetches",
        rename = "max-concurrent-fetches"
    )]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_cache_capacity", rename = "cache-capacity")]
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_cache_capacity() -> usize {
    1024
}

/// HTTP server settings from `[server]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl GlobalConfig {
    /// Load the global configuration from `~/.depsolve/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path, falling back to defaults when it is absent.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| DepsolveError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            DepsolveError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the depsolve data directory (`~/.depsolve/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".depsolve")
}
