// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Patch-check recipes
//!
//! Reduces a generated multi-source `recipe.yaml` to the sources that carry
//! patches, wrapped in a placeholder `ros-dummy` package. Building the
//! reduced recipe only fetches those sources and applies their patches, which
//! is a quick way to find patches that no longer apply cleanly.

use crate::emit::mapping;
use crate::error::{Result, SchedulerError};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the placeholder package
pub const DUMMY_PACKAGE: &str = "ros-dummy";

/// Version of the placeholder package
pub const DUMMY_VERSION: &str = "2024.01.17";

/// Maintainer listed in `extra.recipe-maintainers`
pub const DUMMY_MAINTAINER: &str = "ros-forge";

/// Source entries of `recipe` that declare `patches`, in recipe order
///
/// `source` may be a list or a single mapping. Fails if the recipe has no
/// `source` at all.
pub fn patched_sources(recipe: &Value) -> Result<Vec<Value>> {
    let entries = match recipe.get("source") {
        Some(Value::Sequence(seq)) => seq.clone(),
        Some(single @ Value::Mapping(_)) => vec![single.clone()],
        _ => return Err(SchedulerError::MissingSource),
    };

    Ok(entries
        .into_iter()
        .filter(|entry| entry.get("patches").is_some())
        .collect())
}

/// Build the patch-check recipe for a generated recipe
pub fn patch_check_recipe(recipe: &Value) -> Result<Value> {
    let sources = patched_sources(recipe)?;
    tracing::info!("{} sources carry patches", sources.len());

    Ok(mapping([
        (
            "package",
            mapping([("name", DUMMY_PACKAGE), ("version", DUMMY_VERSION)]),
        ),
        ("source", Value::Sequence(sources)),
        ("build", mapping([("number", 0)])),
        (
            "about",
            mapping([
                ("home", "https://www.ros.org/"),
                ("license", "BSD-3-Clause"),
                ("summary", "Robot Operating System"),
            ]),
        ),
        (
            "extra",
            mapping([(
                "recipe-maintainers",
                Value::Sequence(vec![Value::from(DUMMY_MAINTAINER)]),
            )]),
        ),
    ]))
}

/// Backup location used when rewriting a recipe in place (`recipe.yaml.bak`)
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Read `input` and write its patch-check recipe to `output`
///
/// With `output == None` the recipe is rewritten in place and the original
/// is kept next to it as `*.bak`. Returns the number of sources kept.
pub fn write_patch_check(input: &Path, output: Option<&Path>) -> Result<usize> {
    let content = fs::read_to_string(input).map_err(|source| SchedulerError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let recipe: Value = serde_yaml::from_str(&content).map_err(|source| SchedulerError::Parse {
        path: input.to_path_buf(),
        source,
    })?;

    let reduced = patch_check_recipe(&recipe)?;
    let kept = reduced
        .get("source")
        .and_then(Value::as_sequence)
        .map_or(0, Vec::len);
    let text = serde_yaml::to_string(&reduced).map_err(|source| SchedulerError::Parse {
        path: input.to_path_buf(),
        source,
    })?;

    let target = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let backup = backup_path(input);
            fs::rename(input, &backup).map_err(|source| SchedulerError::Io {
                path: backup.clone(),
                source,
            })?;
            tracing::debug!("Backed up {} to {}", input.display(), backup.display());
            input.to_path_buf()
        }
    };

    fs::write(&target, text).map_err(|source| SchedulerError::Io {
        path: target.clone(),
        source,
    })?;
    Ok(kept)
}
