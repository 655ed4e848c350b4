// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Migrate command - lists published packages that must be rebuilt

use super::GlobalOpts;
use crate::migrate::{load_migration, load_repodata, plan_migration, ros_name};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the migrate command
pub fn run(
    global: &GlobalOpts,
    repodata: &Path,
    migration: &Path,
    distro: &str,
    ros_names: bool,
) -> Result<()> {
    let data = load_repodata(repodata)
        .with_context(|| format!("Failed to load repodata from {}", repodata.display()))?;
    let migration = load_migration(migration)
        .with_context(|| format!("Failed to load migration from {}", migration.display()))?;

    if migration.packages.is_empty() {
        anyhow::bail!("Migration lists no packages");
    }

    let prefix = format!("ros-{distro}");
    let order = plan_migration(&data, &prefix, &migration.packages)?;

    let names: Vec<String> = order
        .iter()
        .map(|p| {
            if ros_names {
                ros_name(p.as_str(), &prefix)
            } else {
                p.as_str().to_string()
            }
        })
        .collect();

    if global.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            println!("{name}");
        }
    }

    Ok(())
}
