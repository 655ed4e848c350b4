// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Requirement extraction and package classification
//!
//! Requirements arrive as loosely typed strings such as
//! `"ros-humble-rclcpp >=16.0"`. Everything downstream works on bare names,
//! classified once into buildable or external packages.

use crate::types::{PackageKind, PackageName, RequirementMap};
use indexmap::{IndexMap, IndexSet};

/// Strip a version constraint, keeping the first whitespace-separated token
#[must_use]
pub fn strip_constraint(requirement: &str) -> Option<&str> {
    requirement.split_whitespace().next()
}

/// Classifies package names by the configured naming convention
#[derive(Debug, Clone)]
pub struct PrefixClassifier {
    prefixes: Vec<String>,
}

impl PrefixClassifier {
    /// Build a classifier; empty prefixes are ignored
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    /// Classify a bare package name
    #[must_use]
    pub fn classify(&self, name: &str) -> PackageKind {
        if self.prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            PackageKind::Buildable
        } else {
            PackageKind::External
        }
    }

    /// Shorthand for `classify(name) == Buildable`
    #[must_use]
    pub fn is_buildable(&self, name: &str) -> bool {
        self.classify(name) == PackageKind::Buildable
    }

    /// Configured prefixes
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Buildable requirement names of one package, in declaration order
///
/// Constraints are stripped and duplicates dropped. Blank entries and
/// external packages are skipped; this never fails.
pub fn extract_buildable<'a, I>(
    requirements: I,
    classifier: &PrefixClassifier,
) -> Vec<PackageName>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = IndexSet::new();
    for req in requirements {
        if let Some(name) = strip_constraint(req) {
            if classifier.is_buildable(name) {
                seen.insert(name);
            }
        }
    }
    seen.into_iter().map(PackageName::from).collect()
}

/// Normalize untyped requirement values into stripped name lists
///
/// Non-string entries (numbers, maps, nulls) and blank strings are silently
/// dropped. Key order is preserved.
#[must_use]
pub fn normalize(raw: IndexMap<String, Vec<serde_yaml::Value>>) -> RequirementMap {
    raw.into_iter()
        .map(|(pkg, reqs)| {
            let names = reqs
                .iter()
                .filter_map(serde_yaml::Value::as_str)
                .filter_map(strip_constraint)
                .map(str::to_string)
                .collect();
            (PackageName::new(pkg), names)
        })
        .collect()
}
