//! Concurrent recursive tree construction.
//!
//! Each node runs as its own task: fetch metadata, select a version, fetch
//! the manifest, then spawn one task per declared dependency into the node's
//! [`JoinSet`] and join them all. A request therefore forms one task group,
//! and the top-level call returns only after every node in the tree has
//! finished, resolved or not.
//!
//! A failure stops only the node that hit it. Siblings and ancestors keep
//! going, and the failure is recorded on the node rather than returned.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use depsolve_core::config::ResolverConfig;
use depsolve_core::metadata::{RegistryManifest, RegistryMetadata};
use depsolve_core::node::{FailureKind, NodeFailure, NodeStatus, PackageNode};
use depsolve_registry::{FetchError, RegistryClient};
use depsolve_util::errors::DepsolveError;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::constraint;
use crate::error::ResolveError;
use crate::range::Constraint;

/// The output of one top-level resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub root: PackageNode,
    pub stats: ResolveStats,
}

/// Counters collected while resolving one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Node occurrences in the tree, root included.
    pub nodes: usize,
    pub failed: usize,
    pub cycles: usize,
    pub metadata_fetches: usize,
    pub manifest_fetches: usize,
    /// Most node tasks alive at the same moment.
    pub peak_tasks: usize,
    pub elapsed: Duration,
}

impl ResolveStats {
    pub fn fetches(&self) -> usize {
        self.metadata_fetches + self.manifest_fetches
    }
}

/// Resolves dependency trees against one registry.
///
/// Cloning is cheap; clones share the registry client and the fetch limit.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<dyn RegistryClient>,
    fetch_permits: Arc<Semaphore>,
}

impl Resolver {
    /// `max_concurrent_fetches` bounds registry requests in flight across every
    /// request served by this resolver. Node tasks waiting for a permit queue up.
    pub fn new(registry: Arc<dyn RegistryClient>, max_concurrent_fetches: usize) -> Self {
        Self {
            registry,
            fetch_permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
        }
    }

    pub fn from_config(registry: Arc<dyn RegistryClient>, config: &ResolverConfig) -> Self {
        Self::new(registry, config.max_concurrent_fetches)
    }

    /// Resolve `name` at `constraint` and every transitive dependency below it.
    ///
    /// Fails only when `name` is empty or the root task itself dies. Anything
    /// that goes wrong inside the tree is reported on the affected node.
    pub async fn resolve(&self, name: &str, constraint: &str) -> miette::Result<Resolution> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DepsolveError::InvalidPackage {
                message: "package name is empty".to_string(),
            }
            .into());
        }

        let started = Instant::now();
        let request = Arc::new(RequestContext {
            registry: self.registry.clone(),
            fetch_permits: self.fetch_permits.clone(),
            counters: Counters::default(),
        });

        tracing::debug!("resolving {name}@{constraint}");
        let root = tokio::spawn(resolve_node(
            request.clone(),
            name.to_string(),
            constraint.to_string(),
            None,
        ))
        .await
        .map_err(|e| DepsolveError::Resolution {
            message: format!("task resolving {name}@{constraint} ended abnormally: {e}"),
        })?;

        let stats = request.counters.finish(&root, started.elapsed());
        tracing::info!(
            "resolved {name}@{constraint} -> {}: {} nodes, {} failed, {} cycles, {} fetches in {:?}",
            root.version_str(),
            stats.nodes,
            stats.failed,
            stats.cycles,
            stats.fetches(),
            stats.elapsed
        );
        Ok(Resolution { root, stats })
    }
}

/// State shared by every task of one request.
struct RequestContext {
    registry: Arc<dyn RegistryClient>,
    fetch_permits: Arc<Semaphore>,
    counters: Counters,
}

impl RequestContext {
    async fn fetch_metadata(&self, name: &str) -> Result<RegistryMetadata, FetchError> {
        let _permit = self.fetch_permits.acquire().await;
        self.counters.metadata_fetches.fetch_add(1, Ordering::SeqCst);
        self.registry.get_metadata(name).await
    }

    async fn fetch_manifest(&self, name: &str, version: &str) -> Result<RegistryManifest, FetchError> {
        let _permit = self.fetch_permits.acquire().await;
        self.counters.manifest_fetches.fetch_add(1, Ordering::SeqCst);
        self.registry.get_manifest(name, version).await
    }
}

#[derive(Default)]
struct Counters {
    metadata_fetches: AtomicUsize,
    manifest_fetches: AtomicUsize,
    live_tasks: AtomicUsize,
    peak_tasks: AtomicUsize,
}

impl Counters {
    fn task_started(&self) {
        let live = self.live_tasks.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_tasks.fetch_max(live, Ordering::SeqCst);
    }

    fn task_finished(&self) {
        self.live_tasks.fetch_sub(1, Ordering::SeqCst);
    }

    fn finish(&self, root: &PackageNode, elapsed: Duration) -> ResolveStats {
        let mut stats = ResolveStats {
            metadata_fetches: self.metadata_fetches.load(Ordering::SeqCst),
            manifest_fetches: self.manifest_fetches.load(Ordering::SeqCst),
            peak_tasks: self.peak_tasks.load(Ordering::SeqCst),
            elapsed,
            ..ResolveStats::default()
        };
        for node in root.iter() {
            stats.nodes += 1;
            match node.status {
                NodeStatus::Failed => stats.failed += 1,
                NodeStatus::Cycle => stats.cycles += 1,
                NodeStatus::Resolved => {}
            }
        }
        stats
    }
}

/// One link of the chain from the root down to the node being resolved.
struct Ancestor {
    name: String,
    constraint: String,
    parent: Option<Arc<Ancestor>>,
}

fn on_chain(chain: &Option<Arc<Ancestor>>, name: &str, constraint: &str) -> bool {
    let mut link = chain.as_deref();
    while let Some(ancestor) = link {
        if ancestor.name == name && ancestor.constraint == constraint {
            return true;
        }
        link = ancestor.parent.as_deref();
    }
    false
}

fn resolve_node(
    request: Arc<RequestContext>,
    name: String,
    constraint: String,
    parent: Option<Arc<Ancestor>>,
) -> BoxFuture<'static, PackageNode> {
    async move {
        request.counters.task_started();
        let node = match expand(&request, &name, &constraint, parent).await {
            Ok(node) => node,
            Err(e) => {
                tracing::warn!("{name}@{constraint} unresolved: {e}");
                PackageNode::failed(name, constraint, e.to_failure())
            }
        };
        request.counters.task_finished();
        node
    }
    .boxed()
}

async fn expand(
    request: &Arc<RequestContext>,
    name: &str,
    constraint: &str,
    parent: Option<Arc<Ancestor>>,
) -> Result<PackageNode, ResolveError> {
    let parsed = Constraint::parse(constraint)?;
    let metadata = request.fetch_metadata(name).await?;
    let version = constraint::select(&parsed, &metadata)?;
    let manifest = request.fetch_manifest(name, &version.to_string()).await?;
    tracing::debug!(
        "{name}@{constraint} -> {version} ({} dependencies)",
        manifest.dependencies.len()
    );

    let chain = Some(Arc::new(Ancestor {
        name: name.to_string(),
        constraint: constraint.to_string(),
        parent,
    }));

    let mut dependencies = BTreeMap::new();
    let mut pending = BTreeMap::new();
    let mut children = JoinSet::new();
    for (dep_name, dep_constraint) in manifest.dependencies {
        if on_chain(&chain, &dep_name, &dep_constraint) {
            tracing::debug!("cycle: {name}@{version} -> {dep_name}@{dep_constraint}");
            dependencies.insert(dep_name.clone(), PackageNode::cycle(dep_name, dep_constraint));
            continue;
        }
        pending.insert(dep_name.clone(), dep_constraint.clone());
        let task = resolve_node(request.clone(), dep_name.clone(), dep_constraint, chain.clone());
        children.spawn(async move { (dep_name, task.await) });
    }

    while let Some(joined) = children.join_next().await {
        match joined {
            Ok((dep_name, child)) => {
                pending.remove(&dep_name);
                dependencies.insert(dep_name, child);
            }
            Err(e) => tracing::error!("dependency task of {name}@{version} ended abnormally: {e}"),
        }
    }
    for (dep_name, dep_constraint) in pending {
        let failure = NodeFailure::new(FailureKind::Aborted, "resolution task ended abnormally");
        dependencies.insert(
            dep_name.clone(),
            PackageNode::failed(dep_name, dep_constraint, failure),
        );
    }

    Ok(PackageNode::resolved(name, constraint, version, dependencies))
}

