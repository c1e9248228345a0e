//! Registry data consumed by the resolver.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;

/// The set of versions a registry currently publishes for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryMetadata {
    pub name: String,
    pub versions: BTreeSet<Version>,
}

impl RegistryMetadata {
    pub fn new(name: impl Into<String>, versions: impl IntoIterator<Item = Version>) -> Self {
        Self {
            name: name.into(),
            versions: versions.into_iter().collect(),
        }
    }

    /// Build from raw version keys, skipping any that are not valid semver.
    pub fn from_raw<'a>(name: impl Into<String>, raw: impl IntoIterator<Item = &'a str>) -> Self {
        let name = name.into();
        let versions = raw
            .into_iter()
            .filter_map(|v| match Version::parse(v) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::debug!("skipping unparseable version {name}@{v}: {e}");
                    None
                }
            })
            .collect();
        Self { name, versions }
    }
}

/// One published version's declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryManifest {
    pub name: String,
    pub version: String,
    /// Dependency name to the range expression its author declared.
    pub dependencies: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_skips_invalid_versions() {
        let meta = RegistryMetadata::from_raw("pkg", ["1.0.0", "not-a-version", "2.1.0-beta.1", "1.2"]);
        assert_eq!(meta.versions.len(), 2);
        assert!(meta.versions.contains(&Version::new(1, 0, 0)));
        assert!(meta.versions.contains(&Version::parse("2.1.0-beta.1").unwrap()));
    }

    #[test]
    fn duplicate_versions_collapse() {
        let meta = RegistryMetadata::new("pkg", [Version::new(1, 0, 0), Version::new(1, 0, 0)]);
        assert_eq!(meta.versions.len(), 1);
    }
}
