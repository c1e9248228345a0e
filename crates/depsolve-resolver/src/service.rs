//! Cache-fronted resolution, shared by the HTTP server and the CLI.

use std::sync::Arc;

use depsolve_core::config::ResolverConfig;
use depsolve_core::node::PackageNode;
use depsolve_registry::RegistryClient;

use crate::cache::ResolutionCache;
use crate::engine::{ResolveStats, Resolver};

/// A tree handed back to a caller.
#[derive(Debug, Clone)]
pub struct Served {
    pub tree: Arc<PackageNode>,
    /// `None` when the tree came from the cache.
    pub stats: Option<ResolveStats>,
}

impl Served {
    pub fn from_cache(&self) -> bool {
        self.stats.is_none()
    }
}

pub struct ResolutionService {
    resolver: Resolver,
    cache: ResolutionCache,
}

impl ResolutionService {
    pub fn new(resolver: Resolver, cache: ResolutionCache) -> Self {
        Self { resolver, cache }
    }

    pub fn from_config(registry: Arc<dyn RegistryClient>, config: &ResolverConfig) -> Self {
        Self::new(
            Resolver::from_config(registry, config),
            ResolutionCache::new(config.cache_capacity),
        )
    }

    /// Serve `name@constraint` from the cache, resolving and storing it on a miss.
    ///
    /// Concurrent misses for the same key each resolve; the last store wins.
    pub async fn resolve(&self, name: &str, constraint: &str) -> miette::Result<Served> {
        let name = name.trim();
        if let Some(tree) = self.cache.lookup(name, constraint) {
            return Ok(Served { tree, stats: None });
        }

        let resolution = self.resolver.resolve(name, constraint).await?;
        let tree = Arc::new(resolution.root);
        if !self.cache.store_for(constraint, tree.clone()) {
            tracing::debug!("not caching {name}@{constraint}: tree is incomplete");
        }
        Ok(Served {
            tree,
            stats: Some(resolution.stats),
        })
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }
}
