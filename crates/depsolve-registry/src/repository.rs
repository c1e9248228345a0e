//! Registry URL layout.

use depsolve_core::config::RegistryConfig;
use reqwest::Url;

use crate::error::FetchError;

/// A registry origin serving the npm JSON API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub url: String,
}

impl Registry {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(&config.url)
    }

    /// The public npm registry.
    pub fn npmjs() -> Self {
        Self::new(depsolve_core::DEFAULT_REGISTRY_URL)
    }

    /// URL of the document listing every published version of `name`.
    ///
    /// The name is one path segment, so scoped names encode their separator
    /// (`@types/node` becomes `@types%2Fnode`) and characters such as `?`,
    /// `#` and `%` are escaped.
    pub fn metadata_url(&self, name: &str) -> Result<Url, FetchError> {
        self.url_with(&[name])
    }

    /// URL of the manifest for one published version.
    pub fn manifest_url(&self, name: &str, version: &str) -> Result<Url, FetchError> {
        self.url_with(&[name, version])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let invalid = |message: String| FetchError::InvalidUrl {
            url: self.url.clone(),
            message,
        };
        let mut url = Url::parse(&self.url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::npmjs()
    }
}
