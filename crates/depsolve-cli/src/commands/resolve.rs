//! Handler for `depsolve resolve`.

use std::sync::Arc;

use console::Style;
use depsolve_core::config::GlobalConfig;
use depsolve_core::node::PackageNode;
use depsolve_registry::RegistryClient;
use depsolve_resolver::graph::{self, DependencyGraph};
use depsolve_resolver::service::ResolutionService;
use depsolve_util::errors::DepsolveError;
use depsolve_util::progress;
use miette::Result;

/// Options for `depsolve resolve`.
pub struct ResolveOptions {
    pub json: bool,
    /// Maximum tree depth to print.
    pub depth: Option<usize>,
    /// Print the path from the root to this package instead of the tree.
    pub why: Option<String>,
    /// Print packages resolved at more than one version instead of the tree.
    pub duplicates: bool,
}

pub async fn exec(
    registry: Arc<dyn RegistryClient>,
    config: &GlobalConfig,
    package: &str,
    constraint: &str,
    opts: &ResolveOptions,
) -> Result<()> {
    let service = ResolutionService::from_config(registry, &config.resolver);

    let pb = progress::spinner(&format!("Resolving {package}@{constraint}"));
    let served = service.resolve(package, constraint).await;
    pb.finish_and_clear();
    let served = served?;
    let tree = served.tree.as_ref();

    if opts.json {
        let json = tree.to_json_pretty().map_err(|e| DepsolveError::Generic {
            message: format!("Failed to serialize tree: {e}"),
        })?;
        println!("{json}");
    } else if let Some(target) = &opts.why {
        print_why(tree, target);
    } else if opts.duplicates {
        print_duplicates(tree);
    } else {
        print!("{}", graph::render_tree(tree, opts.depth));
    }

    if let Some(stats) = &served.stats {
        progress::status(
            "Resolved",
            &format!(
                "{} ({} packages, {} fetches in {:.2}s)",
                tree,
                stats.nodes,
                stats.fetches(),
                stats.elapsed.as_secs_f64()
            ),
        );
    }
    for failed in tree.failures() {
        let reason = failed
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();
        progress::status_warn("Unresolved", &format!("{}@{}: {reason}", failed.name, failed.constraint));
    }

    if !tree.is_resolved() {
        return Err(DepsolveError::Resolution {
            message: format!("could not resolve {package}@{constraint}"),
        }
        .into());
    }
    Ok(())
}

fn print_why(tree: &PackageNode, target: &str) {
    let graph = DependencyGraph::from_tree(tree);
    let Some(path) = graph.find_path(target) else {
        println!("Package '{target}' not found in the tree.");
        return;
    };
    println!("Path to {target}:");
    for (i, node) in path.iter().enumerate() {
        let indent = "  ".repeat(i);
        println!("{indent}{node}");
    }

    let dependents = graph.dependents_of(target);
    if !dependents.is_empty() {
        println!();
        println!("Required by:");
        for (node, constraint) in dependents {
            println!("  {node} ({target} {constraint})");
        }
    }
}

fn print_duplicates(tree: &PackageNode) {
    let graph = DependencyGraph::from_tree(tree);
    let duplicates = graph.duplicates();
    if duplicates.is_empty() {
        println!("No duplicate packages.");
        return;
    }
    let bold = Style::new().bold();
    for (name, versions) in duplicates {
        let versions: Vec<&str> = versions.into_iter().collect();
        println!("{} {}", bold.apply_to(name), versions.join(", "));
    }
}
