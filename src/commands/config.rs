// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - prints the effective configuration

use super::{resolve_config, ConfigOverrides, GlobalOpts};
use anyhow::{Context, Result};

/// Print the effective configuration (file + environment)
pub fn run(global: &GlobalOpts) -> Result<()> {
    let cfg = resolve_config(global, &ConfigOverrides::default())?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
    } else {
        let text = toml::to_string_pretty(&cfg).context("Failed to serialize configuration")?;
        print!("{text}");
    }

    if let Some(path) = global.config.clone().or_else(crate::config::default_path) {
        tracing::debug!("Config file: {}", path.display());
    }
    Ok(())
}
