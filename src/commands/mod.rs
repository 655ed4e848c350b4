// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod graph;
pub mod migrate;
pub mod patches;
pub mod schedule;

use crate::config::SchedulerConfig;
use crate::recipes::{load_names, load_requirements, scan_recipes};
use crate::types::{PackageName, RequirementMap};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Emit machine-readable JSON
    pub json: bool,
    /// Disable ANSI colors
    pub no_color: bool,
}

/// Where the requirement mapping comes from
#[derive(Debug, Clone, Default)]
pub struct InputArgs {
    /// JSON/YAML `{package: [requirements]}` file
    pub requirements: Option<PathBuf>,
    /// Directory of recipe YAML files
    pub recipes: Option<PathBuf>,
    /// Restrict the run to the names listed in this file
    pub names: Option<PathBuf>,
}

/// CLI overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replace `max_batch_size`
    pub batch_size: Option<usize>,
    /// Extra always-isolated packages
    pub isolate: Vec<String>,
    /// Replace the buildable prefixes when non-empty
    pub prefixes: Vec<String>,
}

/// Load configuration and apply CLI overrides
pub fn resolve_config(global: &GlobalOpts, overrides: &ConfigOverrides) -> Result<SchedulerConfig> {
    let mut cfg = crate::config::load(global.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(size) = overrides.batch_size {
        cfg.max_batch_size = size;
    }
    for pkg in &overrides.isolate {
        if !cfg.always_isolated.contains(pkg) {
            cfg.always_isolated.push(pkg.clone());
        }
    }
    if !overrides.prefixes.is_empty() {
        cfg.buildable_prefixes.clone_from(&overrides.prefixes);
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Read the requirement mapping and the optional names-to-build list
///
/// With `--recipes`, the recipes found are the names to build unless a
/// `--names` file narrows them further.
pub fn load_input(input: &InputArgs) -> Result<(RequirementMap, Option<Vec<PackageName>>)> {
    let (requirements, mut names) = match (&input.requirements, &input.recipes) {
        (Some(path), None) => {
            let map = load_requirements(path)
                .with_context(|| format!("Failed to load requirements from {}", path.display()))?;
            (map, None)
        }
        (None, Some(dir)) => {
            let set = scan_recipes(dir)
                .with_context(|| format!("Failed to scan recipes in {}", dir.display()))?;
            (set.requirements, Some(set.names))
        }
        (Some(_), Some(_)) => anyhow::bail!("Use either --requirements or --recipes, not both"),
        (None, None) => anyhow::bail!("One of --requirements or --recipes is required"),
    };

    if let Some(path) = &input.names {
        let listed = load_names(path)
            .with_context(|| format!("Failed to load names from {}", path.display()))?;
        names = Some(match names {
            Some(found) => listed.into_iter().filter(|n| found.contains(n)).collect(),
            None => listed,
        });
    }

    tracing::info!("Loaded requirements for {} packages", requirements.len());
    Ok((requirements, names))
}
