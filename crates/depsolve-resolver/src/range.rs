//! npm-style version range parsing on top of `semver::VersionReq`.
//!
//! npm ranges differ from Cargo requirements in a few ways that are
//! translated here:
//! - comparators are separated by whitespace instead of commas
//! - `a || b` is a union of ranges
//! - `1.2.3 - 2.0.0` is an inclusive hyphen range
//! - a bare version (`1.2.3`, `1.2`) is an exact match, not a caret range
//! - a leading `v` is allowed (`v1.2.3`, `>=v1.0.0`)
//! - `latest` and the empty string match any release
//!
//! Prerelease handling is left to `semver`, which already follows npm: a
//! prerelease only matches a comparator naming the same `major.minor.patch`.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

use crate::error::ResolveError;

/// Operators that may be written apart from their version (`>= 1.2.3`).
const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "^", "~"];

/// A parsed range expression: satisfied when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl Constraint {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let alternatives = raw
            .split("||")
            .map(|alt| {
                let translated = translate(alt)?;
                VersionReq::parse(&translated).map_err(|e| e.to_string())
            })
            .collect::<Result<Vec<_>, String>>()
            .map_err(|reason| ResolveError::InvalidConstraint {
                constraint: raw.to_string(),
                reason,
            })?;
        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn alternatives(&self) -> &[VersionReq] {
        &self.alternatives
    }
}

impl FromStr for Constraint {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The single version an expression pins, if it names exactly one
/// (`1.2.5`, `=1.2.5`, `v1.2.5`).
pub fn exact_version(raw: &str) -> Option<Version> {
    let s = raw.trim();
    let s = s.strip_prefix('=').unwrap_or(s).trim_start();
    Version::parse(strip_v(s)).ok()
}

/// Rewrite one `||` alternative into the comma-separated form `VersionReq` reads.
fn translate(alt: &str) -> Result<String, String> {
    let alt = alt.split_whitespace().collect::<Vec<_>>().join(" ");
    if alt.is_empty() || alt == "latest" {
        return Ok("*".to_string());
    }

    if let Some((lower, upper)) = alt.split_once(" - ") {
        if lower.contains(' ') || upper.contains(' ') || upper.is_empty() {
            return Err(format!("malformed hyphen range `{alt}`"));
        }
        return Ok(format!(">={}, <={}", strip_v(lower), strip_v(upper)));
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in alt.split(' ') {
        if OPERATORS.contains(&token) {
            if let Some(op) = pending_op {
                return Err(format!("operator `{token}` follows operator `{op}`"));
            }
            pending_op = Some(token);
            continue;
        }
        let token = match pending_op.take() {
            Some(op) => format!("{op}{token}"),
            None => token.to_string(),
        };
        comparators.push(comparator(&token));
    }
    if let Some(op) = pending_op {
        return Err(format!("operator `{op}` is missing a version"));
    }
    Ok(comparators.join(", "))
}

fn comparator(token: &str) -> String {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let op = if op == "~>" { "~" } else { op };
    let version = strip_v(version);
    if !is_wildcard(version) {
        let op = if op.is_empty() { "=" } else { op };
        return format!("{op}{version}");
    }
    match truncate_wildcard(version) {
        Some(prefix) => format!("{op}{prefix}.*"),
        None => "*".to_string(),
    }
}

/// The parts before the first wildcard (`1.x.x` gives `1`), or `None` when
/// the major part itself is a wildcard.
fn truncate_wildcard(version: &str) -> Option<String> {
    let parts: Vec<&str> = version
        .split('.')
        .take_while(|part| !matches!(*part, "*" | "x" | "X"))
        .collect();
    (!parts.is_empty()).then(|| parts.join("."))
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// `*`, `x`, `1.x`, `1.2.*` and friends.
fn is_wildcard(version: &str) -> bool {
    version
        .split(['-', '+'])
        .next()
        .unwrap_or_default()
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}
