// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Input readers - requirement mappings, recipe directories and name lists

use crate::error::{Result, SchedulerError};
use crate::extract::normalize;
use crate::types::{PackageName, RequirementMap};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Requirements plus the names of the recipes found
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    /// Requirement mapping (host requirements first, then run)
    pub requirements: RequirementMap,
    /// Package names in discovery order
    pub names: Vec<PackageName>,
}

#[derive(Debug, Deserialize)]
struct RecipeDoc {
    package: Option<RecipePackage>,
    requirements: Option<RecipeRequirements>,
}

#[derive(Debug, Deserialize)]
struct RecipePackage {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecipeRequirements {
    host: Option<Vec<Value>>,
    run: Option<Vec<Value>>,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| SchedulerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a `{package: [requirement, ...]}` mapping from a JSON or YAML file
///
/// A package mapped to `null` has no requirements. Any other non-list value
/// is ignored with a warning.
pub fn load_requirements(path: &Path) -> Result<RequirementMap> {
    let content = read(path)?;
    let raw: IndexMap<String, Value> =
        serde_yaml::from_str(&content).map_err(|source| SchedulerError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let lists = raw
        .into_iter()
        .map(|(pkg, value)| {
            let reqs = match value {
                Value::Sequence(seq) => seq,
                Value::Null => Vec::new(),
                other => {
                    tracing::warn!("Ignoring non-list requirements for {}: {:?}", pkg, other);
                    Vec::new()
                }
            };
            (pkg, reqs)
        })
        .collect();

    Ok(normalize(lists))
}

/// Scan a directory tree for `*.yaml` / `*.yml` recipes
///
/// Only `package.name`, `requirements.host` and `requirements.run` are read.
/// Files that do not parse or lack a package name are skipped with a
/// warning; the first recipe wins if a name repeats.
pub fn scan_recipes(dir: &Path) -> Result<RecipeSet> {
    let mut raw: IndexMap<String, Vec<Value>> = IndexMap::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SchedulerError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
        })?;

        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !entry.file_type().is_file() || !is_yaml {
            continue;
        }

        let doc: RecipeDoc = match serde_yaml::from_str(&read(path)?) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let Some(package) = doc.package else {
            tracing::warn!("Skipping {}: no package.name", path.display());
            continue;
        };

        if raw.contains_key(&package.name) {
            tracing::warn!("Duplicate recipe for {} in {}", package.name, path.display());
            continue;
        }

        let reqs = doc.requirements.unwrap_or_default();
        let mut all = reqs.host.unwrap_or_default();
        all.extend(reqs.run.unwrap_or_default());
        tracing::debug!("Found recipe {} ({})", package.name, path.display());
        raw.insert(package.name, all);
    }

    let requirements = normalize(raw);
    let names = requirements.keys().cloned().collect();
    Ok(RecipeSet { requirements, names })
}

/// Load package names, one per line; blank lines and `#` comments are ignored
pub fn load_names(path: &Path) -> Result<Vec<PackageName>> {
    let content = read(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(PackageName::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_requirements_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reqs.json");
        fs::write(
            &path,
            r#"{"ros-b": ["ros-a >=1", 42, null], "ros-a": null, "ros-c": "oops"}"#,
        )
        .unwrap();

        let map = load_requirements(&path).unwrap();
        let keys: Vec<_> = map.keys().map(PackageName::as_str).collect();
        assert_eq!(keys, vec!["ros-b", "ros-a", "ros-c"]);
        assert_eq!(map["ros-b"], vec!["ros-a"]);
        assert!(map["ros-a"].is_empty());
        assert!(map["ros-c"].is_empty());
    }

    #[test]
    fn test_load_requirements_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reqs.yaml");
        fs::write(&path, "ros-a: []\nros-b:\n  - ros-a\n  - python 3.11.*\n").unwrap();

        let map = load_requirements(&path).unwrap();
        assert_eq!(map["ros-b"], vec!["ros-a", "python"]);
    }

    #[test]
    fn test_load_requirements_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "- just\n- a list\n").unwrap();
        assert!(matches!(
            load_requirements(&path),
            Err(SchedulerError::Parse { .. })
        ));
    }

    #[test]
    fn test_scan_recipes() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("ros-humble-b");
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join("recipe.yaml"),
            "package:\n  name: ros-humble-b\n  version: 1.0.0\nrequirements:\n  host:\n    - ros-humble-a\n  run:\n    - python\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "package:\n  name: ros-humble-a\nrequirements:\n  run: null\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("broken.yaml"), "package: [").unwrap();
        fs::write(dir.path().join("meta.yml"), "about: nothing\n").unwrap();

        let set = scan_recipes(dir.path()).unwrap();
        let names: Vec<_> = set.names.iter().map(PackageName::as_str).collect();
        assert_eq!(names, vec!["ros-humble-a", "ros-humble-b"]);
        assert_eq!(set.requirements["ros-humble-b"], vec!["ros-humble-a", "python"]);
    }

    #[test]
    fn test_load_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("names.txt");
        fs::write(&path, "# rebuild list\nros-a\n\n  ros-b  \n").unwrap();
        let names = load_names(&path).unwrap();
        assert_eq!(names, vec![PackageName::from("ros-a"), PackageName::from("ros-b")]);
    }
}
