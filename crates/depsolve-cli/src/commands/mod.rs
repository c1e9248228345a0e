//! Command dispatch and handler modules.

mod resolve;
mod serve;

use std::sync::Arc;

use depsolve_core::config::GlobalConfig;
use depsolve_registry::http::HttpRegistry;
use depsolve_registry::snapshot::SnapshotRegistry;
use depsolve_registry::RegistryClient;
use miette::Result;

use crate::cli::{Cli, Command, RegistrySource};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = GlobalConfig::load()?;
    match cli.command {
        Command::Resolve {
            package,
            constraint,
            json,
            depth,
            why,
            duplicates,
            source,
        } => {
            let opts = resolve::ResolveOptions {
                json,
                depth,
                why,
                duplicates,
            };
            let registry = registry_client(&source, &config)?;
            resolve::exec(registry, &config, &package, &constraint, &opts).await
        }
        Command::Serve { bind, source } => {
            let registry = registry_client(&source, &config)?;
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            serve::exec(registry, &config, &bind).await
        }
    }
}

/// The registry a command reads from: a snapshot file when given, otherwise
/// the HTTP registry from `--registry` or the config.
fn registry_client(source: &RegistrySource, config: &GlobalConfig) -> Result<Arc<dyn RegistryClient>> {
    if let Some(path) = &source.snapshot {
        tracing::info!("using registry snapshot {}", path.display());
        return Ok(Arc::new(SnapshotRegistry::from_path(path)?));
    }
    let mut registry = config.registry.clone();
    if let Some(url) = &source.registry {
        registry.url = url.clone();
    }
    tracing::info!("using registry {}", registry.url);
    Ok(Arc::new(HttpRegistry::from_config(&registry)?))
}
