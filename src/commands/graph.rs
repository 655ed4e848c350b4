// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph command - exports the dependency graph to various formats

use super::{load_input, resolve_config, ConfigOverrides, GlobalOpts, InputArgs};
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON format
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" | "graphviz" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {s}. Supported: dot, json")),
        }
    }
}

/// Run the graph command
pub fn run(
    global: &GlobalOpts,
    input: &InputArgs,
    prefixes: Vec<String>,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let cfg = resolve_config(
        global,
        &ConfigOverrides {
            prefixes,
            ..Default::default()
        },
    )?;
    let scheduler = Scheduler::new(cfg)?;
    let (requirements, _) = load_input(input)?;
    let graph = scheduler.graph(&requirements);

    info!(
        "Dependency graph: {} packages, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    if let Some(cycle) = graph.find_cycle() {
        let path: Vec<_> = cycle.iter().map(|p| p.as_str()).collect();
        eprintln!("Warning: dependency cycle: {}", path.join(" -> "));
    }

    let content = match format {
        ExportFormat::Dot => graph.to_dot(),
        ExportFormat::Json => graph.to_json().context("Failed to serialize graph to JSON")?,
    };

    match output {
        Some(path) => {
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
