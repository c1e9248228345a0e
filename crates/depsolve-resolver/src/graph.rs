//! Graph view of a resolved tree, for reporting.
//!
//! The tree repeats a package every time it is depended upon. Folding it into
//! a graph keyed by `name@version` makes questions like "who pulls this in"
//! and "which packages appear at more than one version" cheap to answer.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use depsolve_core::node::{NodeStatus, PackageNode};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// A distinct package occurrence in the graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct GraphNode {
    pub name: String,
    /// Resolved version, or the constraint for nodes that never resolved.
    pub label: String,
    pub status: NodeStatus,
}

impl GraphNode {
    fn of(node: &PackageNode) -> Self {
        let label = match &node.version {
            Some(v) => v.to_string(),
            None => node.constraint.clone(),
        };
        Self {
            name: node.name.clone(),
            label,
            status: node.status,
        }
    }

    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.label)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            NodeStatus::Resolved => write!(f, "{}@{}", self.name, self.label),
            NodeStatus::Failed => write!(f, "{}@{} (unresolved)", self.name, self.label),
            NodeStatus::Cycle => write!(f, "{}@{} (cycle)", self.name, self.label),
        }
    }
}

pub struct DependencyGraph {
    /// Edges carry the constraint the dependent declared.
    graph: DiGraph<GraphNode, String>,
    index: HashMap<(String, NodeStatus), NodeIndex>,
    root: NodeIndex,
}

impl DependencyGraph {
    pub fn from_tree(tree: &PackageNode) -> Self {
        let mut graph = Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: NodeIndex::new(0),
        };
        graph.root = graph.add_node(tree);
        graph.add_children(graph.root, tree);
        graph
    }

    fn add_node(&mut self, node: &PackageNode) -> NodeIndex {
        let node = GraphNode::of(node);
        let key = (node.key(), node.status);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    fn add_children(&mut self, parent: NodeIndex, node: &PackageNode) {
        for child in node.dependencies.values() {
            let idx = self.add_node(child);
            if self.graph.edges(parent).any(|e| e.target() == idx) {
                continue;
            }
            self.graph.add_edge(parent, idx, child.constraint.clone());
            self.add_children(idx, child);
        }
    }

    pub fn root(&self) -> &GraphNode {
        &self.graph[self.root]
    }

    /// Every node whose package name is `name`.
    pub fn find(&self, name: &str) -> Vec<&GraphNode> {
        let mut found: Vec<&GraphNode> = self
            .graph
            .node_weights()
            .filter(|n| n.name == name)
            .collect();
        found.sort_by_key(|n| n.key());
        found
    }

    /// Shortest chain of packages from the root down to the first `name` reached.
    pub fn find_path(&self, name: &str) -> Option<Vec<&GraphNode>> {
        let mut previous: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut seen = HashSet::from([self.root]);
        let mut queue = VecDeque::from([self.root]);
        while let Some(current) = queue.pop_front() {
            if self.graph[current].name == name {
                let mut path = vec![&self.graph[current]];
                let mut at = current;
                while let Some(&prev) = previous.get(&at) {
                    path.push(&self.graph[prev]);
                    at = prev;
                }
                path.reverse();
                return Some(path);
            }
            let mut next: Vec<NodeIndex> = self.graph.neighbors(current).collect();
            next.sort_by_key(|&idx| self.graph[idx].key());
            for idx in next {
                if seen.insert(idx) {
                    previous.insert(idx, current);
                    queue.push_back(idx);
                }
            }
        }
        None
    }

    /// Packages that depend directly on any version of `name`, with the
    /// constraint each one declared.
    pub fn dependents_of(&self, name: &str) -> Vec<(&GraphNode, &str)> {
        let mut dependents: Vec<(&GraphNode, &str)> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].name == name)
            .flat_map(|idx| self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| (&self.graph[e.source()], e.weight().as_str()))
            .collect();
        dependents.sort_by_key(|(n, c)| (n.key(), c.to_string()));
        dependents.dedup();
        dependents
    }

    /// Package names resolved at more than one version, with those versions.
    pub fn duplicates(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut versions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for node in self.graph.node_weights() {
            if node.status.is_resolved() {
                versions
                    .entry(node.name.as_str())
                    .or_default()
                    .insert(node.label.as_str());
            }
        }
        versions.retain(|_, v| v.len() > 1);
        versions
    }

    /// Nodes that failed to resolve.
    pub fn unresolved(&self) -> Vec<&GraphNode> {
        let mut nodes: Vec<&GraphNode> = self
            .graph
            .node_weights()
            .filter(|n| n.status == NodeStatus::Failed)
            .collect();
        nodes.sort_by_key(|n| n.key());
        nodes
    }

    /// Distinct packages below the root.
    pub fn len(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Draw `tree` with box connectors, one node per line.
///
/// With `max_depth`, nothing deeper than that many levels below the root is drawn.
pub fn render_tree(tree: &PackageNode, max_depth: Option<usize>) -> String {
    let mut output = format!("{tree}\n");
    render_children(&mut output, tree, "", 1, max_depth);
    output
}

fn render_children(
    output: &mut String,
    node: &PackageNode,
    prefix: &str,
    depth: usize,
    max_depth: Option<usize>,
) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    let count = node.dependencies.len();
    for (i, child) in node.dependencies.values().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{child}"));
        if let Some(error) = &child.error {
            output.push_str(&format!(" [{error}]"));
        }
        output.push('\n');
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        render_children(output, child, &child_prefix, depth + 1, max_depth);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use depsolve_core::node::{FailureKind, NodeFailure};
    use semver::Version;

    use super::*;

    fn leaf(name: &str, constraint: &str, version: &str) -> PackageNode {
        PackageNode::resolved(name, constraint, Version::parse(version).unwrap(), BTreeMap::new())
    }

    fn with(name: &str, constraint: &str, version: &str, deps: Vec<PackageNode>) -> PackageNode {
        let deps = deps.into_iter().map(|d| (d.name.clone(), d)).collect();
        PackageNode::resolved(name, constraint, Version::parse(version).unwrap(), deps)
    }

    /// app -> { http -> { util@1.4.0 }, util@2.0.0, broken (failed) }
    fn sample() -> PackageNode {
        let broken = PackageNode::failed(
            "broken",
            "^9.0.0",
            NodeFailure::new(FailureKind::NoCompatibleVersion, "nothing matches"),
        );
        with(
            "app",
            "latest",
            "1.0.0",
            vec![
                with("http", "^3.0.0", "3.1.0", vec![leaf("util", "^1.0.0", "1.4.0")]),
                leaf("util", "^2.0.0", "2.0.0"),
                broken,
            ],
        )
    }

    #[test]
    fn folds_repeated_packages() {
        let graph = DependencyGraph::from_tree(&sample());
        assert_eq!(graph.root().key(), "app@1.0.0");
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.find("util").len(), 2);
    }

    #[test]
    fn finds_shortest_path() {
        let graph = DependencyGraph::from_tree(&sample());
        let path: Vec<String> = graph
            .find_path("util")
            .unwrap()
            .iter()
            .map(|n| n.key())
            .collect();
        assert_eq!(path, ["app@1.0.0", "util@2.0.0"]);
        assert!(graph.find_path("missing").is_none());
    }

    #[test]
    fn lists_dependents_with_declared_constraints() {
        let graph = DependencyGraph::from_tree(&sample());
        let dependents: Vec<(String, &str)> = graph
            .dependents_of("util")
            .into_iter()
            .map(|(n, c)| (n.key(), c))
            .collect();
        assert_eq!(
            dependents,
            [
                ("app@1.0.0".to_string(), "^2.0.0"),
                ("http@3.1.0".to_string(), "^1.0.0"),
            ]
        );
    }

    #[test]
    fn reports_duplicates_and_failures() {
        let graph = DependencyGraph::from_tree(&sample());
        let dups = graph.duplicates();
        assert_eq!(dups.len(), 1);
        assert_eq!(
            dups["util"].iter().copied().collect::<Vec<_>>(),
            ["1.4.0", "2.0.0"]
        );
        let unresolved = graph.unresolved();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].to_string(), "broken@^9.0.0 (unresolved)");
    }

    #[test]
    fn renders_tree_with_connectors() {
        let rendered = render_tree(&sample(), None);
        let expected = "\
app@1.0.0
├── broken@^9.0.0 (unresolved) [no-compatible-version: nothing matches]
├── http@3.1.0
│   └── util@1.4.0
└── util@2.0.0
";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn render_respects_depth_limit() {
        let rendered = render_tree(&sample(), Some(1));
        assert!(rendered.contains("http@3.1.0"));
        assert!(!rendered.contains("util@1.4.0"));
        assert_eq!(render_tree(&sample(), Some(0)), "app@1.0.0\n");
    }
}
