// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Patches command - writes a patch-check recipe

use super::GlobalOpts;
use crate::patches::{backup_path, write_patch_check};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the patches command
pub fn run(global: &GlobalOpts, recipe: &Path, output: Option<&Path>) -> Result<()> {
    let kept = write_patch_check(recipe, output)
        .with_context(|| format!("Failed to reduce {}", recipe.display()))?;

    let written = output.unwrap_or(recipe);
    if global.json {
        let report = serde_json::json!({
            "recipe": written,
            "backup": output.is_none().then(|| backup_path(recipe)),
            "patched_sources": kept,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Wrote {} patched sources to {}", kept, written.display());
        if output.is_none() {
            println!("Original kept at {}", backup_path(recipe).display());
        }
    }

    Ok(())
}
