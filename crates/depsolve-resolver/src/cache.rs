//! Process-wide store of resolved trees.
//!
//! Trees are keyed by root name and *resolved* version, so any request that
//! names that exact version is served from the cache regardless of which range
//! originally produced it. The constraint string of each stored request is kept
//! as an alias so repeating it also hits.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use depsolve_core::node::PackageNode;
use lru::LruCache;
use semver::Version;

use crate::range;

/// Bounded LRU cache of complete resolution trees.
pub struct ResolutionCache {
    inner: Mutex<CacheState>,
}

struct CacheState {
    trees: LruCache<(String, Version), Arc<PackageNode>>,
    aliases: LruCache<(String, String), Version>,
}

impl ResolutionCache {
    /// A cache holding at most `capacity` trees (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheState {
                trees: LruCache::new(capacity),
                aliases: LruCache::new(capacity),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Find a stored tree for `name` at an exact version or a previously seen range.
    pub fn lookup(&self, name: &str, version_or_constraint: &str) -> Option<Arc<PackageNode>> {
        let mut state = self.state();
        let version = match range::exact_version(version_or_constraint) {
            Some(v) => v,
            None => state
                .aliases
                .get(&(name.to_string(), version_or_constraint.trim().to_string()))?
                .clone(),
        };
        let hit = state.trees.get(&(name.to_string(), version)).cloned();
        if let Some(tree) = &hit {
            tracing::debug!("cache hit for {name}@{version_or_constraint} -> {}", tree.version_str());
        }
        hit
    }

    /// Store a tree under its root name and resolved version.
    ///
    /// Trees with an unresolved root or any failed node are not stored, so a
    /// transient registry failure is not served forever. Returns whether the
    /// tree was stored.
    pub fn store(&self, tree: Arc<PackageNode>) -> bool {
        self.insert(None, tree)
    }

    /// Like [`store`](Self::store), also remembering `constraint` as an alias.
    pub fn store_for(&self, constraint: &str, tree: Arc<PackageNode>) -> bool {
        self.insert(Some(constraint), tree)
    }

    fn insert(&self, constraint: Option<&str>, tree: Arc<PackageNode>) -> bool {
        let Some(version) = tree.version.clone() else {
            return false;
        };
        if !tree.is_complete() {
            return false;
        }

        let name = tree.name.clone();
        let mut state = self.state();
        if let Some(constraint) = constraint {
            state
                .aliases
                .put((name.clone(), constraint.trim().to_string()), version.clone());
        }
        tracing::info!("caching {name}@{version} ({} nodes)", tree.node_count());
        state.trees.put((name, version), tree);
        true
    }

    pub fn len(&self) -> usize {
        self.state().trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.trees.clear();
        state.aliases.clear();
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(1024)
    }
}
