// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Schedule command - computes the build plan and writes its artifacts

use super::{load_input, resolve_config, ConfigOverrides, GlobalOpts, InputArgs};
use crate::config::SchedulerConfig;
use crate::emit::{build_order, EmitOptions, EmitterKind, Platform};
use crate::scheduler::Scheduler;
use crate::types::BuildPlan;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the schedule command
#[derive(Debug, Clone)]
pub struct ScheduleArgs {
    /// Input selection
    pub input: InputArgs,
    /// Configuration overrides
    pub overrides: ConfigOverrides,
    /// Write the build order listing here
    pub build_order: Option<PathBuf>,
    /// Pipeline format to emit
    pub emit: Option<EmitterKind>,
    /// Target platform for the pipeline
    pub platform: Platform,
    /// Branch that triggers the pipeline
    pub trigger_branch: String,
    /// File whose content replaces the default build script
    pub script: Option<PathBuf>,
    /// Pipeline output file (stdout if not specified)
    pub output: Option<PathBuf>,
}

/// JSON report printed with `--json`
#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    generated_at: DateTime<Utc>,
    config: &'a SchedulerConfig,
    plan: &'a BuildPlan,
}

/// Run the schedule command
pub fn run(global: &GlobalOpts, args: ScheduleArgs) -> Result<()> {
    let cfg = resolve_config(global, &args.overrides)?;
    let scheduler = Scheduler::new(cfg)?;

    let (requirements, names) = load_input(&args.input)?;
    let plan = scheduler
        .schedule(&requirements, names.as_deref())
        .context("Failed to compute build plan")?;

    if let Some(path) = &args.build_order {
        fs::write(path, build_order(&plan))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote build order to {}", path.display());
    }

    if let Some(kind) = args.emit {
        let script = match &args.script {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read script {}", path.display()))?,
            ),
            None => None,
        };
        let options = EmitOptions {
            trigger_branch: args.trigger_branch.clone(),
            platform: args.platform,
            script,
        };

        let emitter = kind.emitter();
        let rendered = emitter
            .emit(&plan, &options)
            .context("Failed to render pipeline")?;
        let Some(content) = rendered else {
            eprintln!("Warning: no jobs to run; {} pipeline not written", emitter.name());
            return Ok(());
        };

        match &args.output {
            Some(path) => {
                fs::write(path, &content)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                info!("Wrote {} pipeline to {}", emitter.name(), path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                return Ok(());
            }
        }
    }

    if global.json {
        let report = PlanReport {
            generated_at: Utc::now(),
            config: scheduler.config(),
            plan: &plan,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&plan, !global.no_color);
    }

    Ok(())
}

/// Human-readable plan listing
fn print_summary(plan: &BuildPlan, color: bool) {
    if plan.is_empty() {
        println!("Nothing to build.");
        return;
    }

    println!(
        "{} packages, {} levels, {} stages, {} jobs",
        plan.package_count(),
        plan.levels.len(),
        plan.stages.len(),
        plan.job_count()
    );
    println!();

    for (i, stage) in plan.stages.iter().enumerate() {
        let title = format!("stage_{i}");
        if color {
            println!("{}", title.bold());
        } else {
            println!("{title}");
        }
        for (j, batch) in stage.batches().iter().enumerate() {
            let job = format!("job {j}:");
            if color {
                println!("  {} {}", job.cyan(), batch.joined());
            } else {
                println!("  {job} {}", batch.joined());
            }
        }
    }
}
