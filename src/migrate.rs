// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Migration planning over a published repodata snapshot
//!
//! When core packages change ABI, every published package of the distro that
//! depends on them must be rebuilt. This module finds those packages and
//! orders them dependencies-first using the same graph machinery as the
//! scheduler.

use crate::error::{Result, SchedulerError};
use crate::extract::{strip_constraint, PrefixClassifier};
use crate::graph::DependencyGraph;
use crate::types::{PackageName, RequirementMap};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One package entry of a conda `repodata.json`
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRecord {
    /// Package name
    pub name: String,
    /// Version string
    pub version: String,
    /// Dependency specs (`name [constraint]`)
    #[serde(default)]
    pub depends: Vec<String>,
    /// Build number
    #[serde(default)]
    pub build_number: u64,
}

/// The subset of `repodata.json` used for migrations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repodata {
    /// `.tar.bz2` packages keyed by file name
    #[serde(default)]
    pub packages: IndexMap<String, PackageRecord>,
    /// `.conda` packages keyed by file name
    #[serde(default, rename = "packages.conda")]
    pub packages_conda: IndexMap<String, PackageRecord>,
}

impl Repodata {
    /// All records, `.tar.bz2` first
    pub fn records(&self) -> impl Iterator<Item = &PackageRecord> {
        self.packages.values().chain(self.packages_conda.values())
    }
}

/// Migration input file: `packages: [name, ...]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Migration {
    /// Packages whose dependents must be rebuilt
    #[serde(default)]
    pub packages: Vec<String>,
}

/// Read a `repodata.json` file
pub fn load_repodata(path: &Path) -> Result<Repodata> {
    let content = fs::read_to_string(path).map_err(|source| SchedulerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SchedulerError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a `migration.yaml` file
pub fn load_migration(path: &Path) -> Result<Migration> {
    let content = fs::read_to_string(path).map_err(|source| SchedulerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| SchedulerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Numeric sort key of a version string
///
/// Each dot-separated component contributes its leading digits, so
/// `1.2.3rc1` compares as `[1, 2, 3]`. Components without digits count as 0.
#[must_use]
pub fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        })
        .collect()
}

/// ROS package name for a distro-prefixed conda name
///
/// `ros-humble-robot-state-publisher` becomes `robot_state_publisher`.
#[must_use]
pub fn ros_name(conda_name: &str, distro_prefix: &str) -> String {
    conda_name
        .strip_prefix(distro_prefix)
        .map_or(conda_name, |rest| rest.trim_start_matches('-'))
        .replace('-', "_")
}

/// Latest record per prefixed package name (version, then build number)
fn latest_records<'a>(
    repodata: &'a Repodata,
    classifier: &PrefixClassifier,
) -> IndexMap<&'a str, &'a PackageRecord> {
    let mut latest: IndexMap<&str, &PackageRecord> = IndexMap::new();
    let mut keys: HashMap<&str, (Vec<u64>, u64)> = HashMap::new();

    for record in repodata.records() {
        if !classifier.is_buildable(&record.name) {
            continue;
        }
        let key = (version_key(&record.version), record.build_number);
        let newer = keys.get(record.name.as_str()).map_or(true, |current| key > *current);
        if newer {
            keys.insert(&record.name, key);
            latest.insert(&record.name, record);
        }
    }

    latest
}

/// Packages of the distro that must be rebuilt, dependencies first
///
/// A package needs rebuilding if any of its published builds depends on one
/// of `migrating`. Ordering comes from the dependency graph of the latest
/// published builds.
pub fn plan_migration(
    repodata: &Repodata,
    distro_prefix: &str,
    migrating: &[String],
) -> Result<Vec<PackageName>> {
    let classifier = PrefixClassifier::new([distro_prefix]);
    let migrating: IndexSet<&str> = migrating.iter().map(String::as_str).collect();

    let mut affected: IndexSet<&str> = IndexSet::new();
    for record in repodata.records() {
        if !classifier.is_buildable(&record.name) {
            continue;
        }
        let hit = record
            .depends
            .iter()
            .filter_map(|d| strip_constraint(d))
            .any(|d| migrating.contains(d));
        if hit {
            affected.insert(&record.name);
        }
    }

    let requirements: RequirementMap = latest_records(repodata, &classifier)
        .into_iter()
        .map(|(name, record)| (PackageName::from(name), record.depends.clone()))
        .collect();
    let graph = DependencyGraph::build(&requirements, &classifier);
    let order = graph.topological_order()?;
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    let mut result: Vec<PackageName> = affected.into_iter().map(PackageName::from).collect();
    result.sort_by_key(|p| position.get(p.as_str()).copied().unwrap_or(usize::MAX));

    tracing::info!("{} packages need migration", result.len());
    Ok(result)
}
