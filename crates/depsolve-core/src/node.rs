//! The resolved dependency tree.
//!
//! Every dependency edge owns its child node exclusively, so the same
//! `(name, version)` pair may appear many times in one tree. Each node records
//! how its resolution ended so callers can tell "no dependencies" apart from
//! "resolution failed".

use std::collections::BTreeMap;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

/// How a node's resolution ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// A concrete version was selected and its manifest was read.
    #[default]
    Resolved,
    /// Resolution stopped at this node; see [`PackageNode::error`].
    Failed,
    /// The node repeats a `(name, constraint)` pair already being resolved by
    /// one of its ancestors and was not expanded.
    Cycle,
}

impl NodeStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, NodeStatus::Resolved)
    }
}

/// Why a node failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    InvalidConstraint,
    NoCompatibleVersion,
    Fetch,
    /// The task resolving this node ended without producing a result.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::InvalidConstraint => "invalid-constraint",
            FailureKind::NoCompatibleVersion => "no-compatible-version",
            FailureKind::Fetch => "fetch",
            FailureKind::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Failure details attached to a [`NodeStatus::Failed`] node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl NodeFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One occurrence of a package in a resolved dependency tree.
///
/// Serializes as `{"name", "version", "dependencies"}` with `version` set to
/// `""` while unresolved. Nodes that did not resolve also carry `"status"` and,
/// when failed, `"error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNode {
    pub name: String,
    /// The range expression this occurrence was requested with.
    #[serde(skip)]
    pub constraint: String,
    #[serde(with = "version_string")]
    pub version: Option<Version>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, PackageNode>,
    #[serde(default, skip_serializing_if = "NodeStatus::is_resolved")]
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeFailure>,
}

impl PackageNode {
    /// A node whose version was selected and whose dependencies were expanded.
    pub fn resolved(
        name: impl Into<String>,
        constraint: impl Into<String>,
        version: Version,
        dependencies: BTreeMap<String, PackageNode>,
    ) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            version: Some(version),
            dependencies,
            status: NodeStatus::Resolved,
            error: None,
        }
    }

    /// A node that stopped resolving; it has no version and no dependencies.
    pub fn failed(
        name: impl Into<String>,
        constraint: impl Into<String>,
        failure: NodeFailure,
    ) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            version: None,
            dependencies: BTreeMap::new(),
            status: NodeStatus::Failed,
            error: Some(failure),
        }
    }

    /// A leaf that closes a dependency cycle.
    pub fn cycle(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            version: None,
            dependencies: BTreeMap::new(),
            status: NodeStatus::Cycle,
            error: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }

    /// The resolved version as a string, or `""` while unresolved.
    pub fn version_str(&self) -> String {
        self.version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    /// Total number of node occurrences in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .dependencies
            .values()
            .map(PackageNode::node_count)
            .sum::<usize>()
    }

    /// Depth-first iterator over this subtree, `self` first.
    pub fn iter(&self) -> impl Iterator<Item = &PackageNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.dependencies.values().rev());
            Some(node)
        })
    }

    /// Every failed node in this subtree.
    pub fn failures(&self) -> Vec<&PackageNode> {
        self.iter()
            .filter(|n| n.status == NodeStatus::Failed)
            .collect()
    }

    /// `true` when no node in this subtree failed. Cycle leaves count as complete.
    pub fn is_complete(&self) -> bool {
        self.iter().all(|n| n.status != NodeStatus::Failed)
    }

    /// Pretty-printed JSON rendering of the tree.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, self.status) {
            (Some(v), _) => write!(f, "{}@{}", self.name, v),
            (None, NodeStatus::Cycle) => write!(f, "{}@{} (cycle)", self.name, self.constraint),
            (None, _) => write!(f, "{}@{} (unresolved)", self.name, self.constraint),
        }
    }
}

/// Serde adapter writing `Option<Version>` as a plain string, `""` for `None`.
mod version_string {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(version: &Option<Version>, s: S) -> Result<S::Ok, S::Error> {
        match version {
            Some(v) => s.collect_str(v),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Version>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() {
            return Ok(None);
        }
        Version::parse(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, version: &str) -> PackageNode {
        PackageNode::resolved(name, "*", Version::parse(version).unwrap(), BTreeMap::new())
    }

    fn sample_tree() -> PackageNode {
        let mut deps = BTreeMap::new();
        deps.insert("b".to_string(), leaf("b", "2.0.0"));
        deps.insert(
            "c".to_string(),
            PackageNode::failed(
                "c",
                "^9.0.0",
                NodeFailure::new(FailureKind::NoCompatibleVersion, "nothing matches"),
            ),
        );
        PackageNode::resolved("a", "^1.0.0", Version::new(1, 4, 0), deps)
    }

    #[test]
    fn serializes_wire_shape() {
        let json = serde_json::to_value(leaf("left-pad", "1.3.0")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "left-pad",
                "version": "1.3.0",
                "dependencies": {}
            })
        );
    }

    #[test]
    fn failed_node_carries_status_and_empty_version() {
        let tree = sample_tree();
        let json = serde_json::to_value(&tree).unwrap();
        let c = &json["dependencies"]["c"];
        assert_eq!(c["version"], "");
        assert_eq!(c["status"], "failed");
        assert_eq!(c["error"]["kind"], "no-compatible-version");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn json_roundtrip_keeps_structure() {
        let tree = sample_tree();
        let json = tree.to_json_pretty().unwrap();
        let back: PackageNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, tree.version);
        assert_eq!(back.dependencies.len(), 2);
        assert_eq!(back.dependencies["c"].status, NodeStatus::Failed);
    }

    #[test]
    fn counts_and_completeness() {
        let tree = sample_tree();
        assert_eq!(tree.node_count(), 3);
        assert!(!tree.is_complete());
        assert_eq!(tree.failures().len(), 1);
        assert_eq!(tree.failures()[0].name, "c");

        let mut deps = BTreeMap::new();
        deps.insert("a".to_string(), PackageNode::cycle("a", "^1.0.0"));
        let cyclic = PackageNode::resolved("b", "*", Version::new(1, 0, 0), deps);
        assert!(cyclic.is_complete());
    }

    #[test]
    fn iter_visits_depth_first_in_name_order() {
        let tree = sample_tree();
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn display() {
        assert_eq!(leaf("b", "2.0.0").to_string(), "b@2.0.0");
        assert_eq!(
            PackageNode::cycle("a", "^1.0.0").to_string(),
            "a@^1.0.0 (cycle)"
        );
    }
}
