//! Version selection: the highest published version satisfying a range.

use depsolve_core::metadata::RegistryMetadata;
use semver::Version;

use crate::error::ResolveError;
use crate::range::Constraint;

/// Pick the highest version in `available` that satisfies `constraint`.
///
/// The result depends only on the set of versions, never on iteration order.
pub fn highest_compatible<'a, I>(constraint: &Constraint, available: I) -> Option<&'a Version>
where
    I: IntoIterator<Item = &'a Version>,
{
    available
        .into_iter()
        .filter(|v| constraint.matches(v))
        .max()
}

/// Parse `constraint` and select from `available`.
pub fn resolve<'a, I>(constraint: &str, available: I) -> Result<Version, ResolveError>
where
    I: IntoIterator<Item = &'a Version>,
{
    let parsed = Constraint::parse(constraint)?;
    let available: Vec<&Version> = available.into_iter().collect();
    highest_compatible(&parsed, available.iter().copied())
        .cloned()
        .ok_or(ResolveError::NoCompatibleVersion {
            constraint: constraint.to_string(),
            available: available.len(),
        })
}

/// Select a version for an already parsed constraint from registry metadata.
pub fn select(constraint: &Constraint, metadata: &RegistryMetadata) -> Result<Version, ResolveError> {
    highest_compatible(constraint, &metadata.versions)
        .cloned()
        .ok_or_else(|| ResolveError::NoCompatibleVersion {
            constraint: constraint.to_string(),
            available: metadata.versions.len(),
        })
}
