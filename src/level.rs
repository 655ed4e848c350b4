// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Topological leveling - assigns every package to a dependency stage
//!
//! Packages are visited in dependencies-first topological order. Each one
//! lands in the lowest stage strictly above every stage holding one of its
//! buildable ancestors.

use crate::error::Result;
use crate::extract::{extract_buildable, PrefixClassifier};
use crate::graph::DependencyGraph;
use crate::types::{PackageName, RequirementMap, Stage};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Result of leveling: ordered stages plus the package-to-stage index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leveling {
    /// Stages in build order
    pub stages: Vec<Stage>,
    /// Stage index of every scheduled package, in placement order
    pub assignment: IndexMap<PackageName, usize>,
}

impl Leveling {
    /// Stage index of a package, if it was scheduled
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.assignment.get(name).copied()
    }

    /// Stages flattened into one build order
    #[must_use]
    pub fn build_order(&self) -> Vec<PackageName> {
        self.stages.iter().flatten().cloned().collect()
    }
}

/// Incremental leveler over one requirement mapping
struct Leveler<'a> {
    requirements: &'a RequirementMap,
    classifier: &'a PrefixClassifier,
    leveling: Leveling,
    warned: HashSet<PackageName>,
}

impl<'a> Leveler<'a> {
    fn new(requirements: &'a RequirementMap, classifier: &'a PrefixClassifier) -> Self {
        Self {
            requirements,
            classifier,
            leveling: Leveling::default(),
            warned: HashSet::new(),
        }
    }

    /// Transitive buildable requirements of `pkg`, walked over the raw mapping
    ///
    /// Names missing from the mapping have no further ancestors; each is
    /// reported once per run.
    fn ancestors(&mut self, pkg: &PackageName) -> IndexSet<PackageName> {
        let mut found = IndexSet::new();
        let mut visited: HashSet<PackageName> = HashSet::from([pkg.clone()]);
        let mut pending = vec![pkg.clone()];

        while let Some(current) = pending.pop() {
            let Some(reqs) = self.requirements.get(&current) else {
                if self.warned.insert(current.clone()) {
                    tracing::warn!(
                        "{} not found in requirements; assuming no further dependencies",
                        current
                    );
                }
                continue;
            };
            for dep in extract_buildable(reqs, self.classifier) {
                if visited.insert(dep.clone()) {
                    found.insert(dep.clone());
                    pending.push(dep);
                }
            }
        }

        found
    }

    fn place(&mut self, pkg: PackageName) {
        let ancestors = self.ancestors(&pkg);
        let target = ancestors
            .iter()
            .filter_map(|a| self.leveling.assignment.get(a))
            .map(|stage| stage + 1)
            .max()
            .unwrap_or(0);

        let stages = &mut self.leveling.stages;
        let index = if target >= stages.len() {
            stages.push(vec![pkg.clone()]);
            stages.len() - 1
        } else {
            stages[target].push(pkg.clone());
            target
        };

        tracing::debug!("{} -> stage {} ({} ancestors)", pkg, index, ancestors.len());
        self.leveling.assignment.insert(pkg, index);
    }
}

/// Buildable ancestors of one package (transitive, deduplicated)
#[must_use]
pub fn ancestors(
    pkg: &PackageName,
    requirements: &RequirementMap,
    classifier: &PrefixClassifier,
) -> IndexSet<PackageName> {
    Leveler::new(requirements, classifier).ancestors(pkg)
}

/// Level packages in exactly the given order
///
/// The order must already place dependencies before dependents; `level`
/// derives such an order from the graph. Re-leveling a previous result's
/// `build_order()` reproduces the same assignment.
pub fn level_ordered<I>(
    order: I,
    requirements: &RequirementMap,
    classifier: &PrefixClassifier,
) -> Leveling
where
    I: IntoIterator<Item = PackageName>,
{
    let mut leveler = Leveler::new(requirements, classifier);
    for pkg in order {
        if leveler.leveling.assignment.contains_key(&pkg) {
            continue;
        }
        leveler.place(pkg);
    }
    leveler.leveling
}

/// Assign each package in `names_to_build` to a stage
///
/// With `None`, every package in the graph is scheduled. Requested names
/// that are not part of the graph are skipped with a warning. Fails only if
/// the graph contains a dependency cycle.
pub fn level(
    graph: &DependencyGraph,
    requirements: &RequirementMap,
    classifier: &PrefixClassifier,
    names_to_build: Option<&[PackageName]>,
) -> Result<Leveling> {
    let order = graph.topological_order()?;

    let selected: Option<HashSet<&str>> = names_to_build.map(|names| {
        names
            .iter()
            .filter(|name| {
                let known = graph.contains(name.as_str());
                if !known {
                    tracing::warn!("{} has no requirements entry; skipping", name);
                }
                known
            })
            .map(PackageName::as_str)
            .collect()
    });

    let filtered = order
        .into_iter()
        .filter(|pkg| selected.as_ref().map_or(true, |s| s.contains(pkg.as_str())));

    Ok(level_ordered(filtered, requirements, classifier))
}
