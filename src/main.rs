// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! buildstage CLI - dependency-aware build stage scheduler

use anyhow::Result;
use buildstage::commands::{
    self, graph::ExportFormat, schedule::ScheduleArgs, ConfigOverrides, GlobalOpts, InputArgs,
};
use buildstage::emit::{EmitterKind, Platform};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "buildstage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "BUILDSTAGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(
        long,
        env = "NO_COLOR",
        global = true,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Requirement input selection
#[derive(Args, Debug)]
struct InputOpts {
    /// JSON or YAML file mapping package names to requirement lists
    #[arg(short, long, conflicts_with = "recipes", required_unless_present = "recipes")]
    requirements: Option<PathBuf>,

    /// Directory of recipe YAML files
    #[arg(long)]
    recipes: Option<PathBuf>,

    /// File listing the package names to build, one per line
    #[arg(long)]
    names: Option<PathBuf>,
}

impl From<InputOpts> for InputArgs {
    fn from(opts: InputOpts) -> Self {
        Self {
            requirements: opts.requirements,
            recipes: opts.recipes,
            names: opts.names,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the staged build plan
    Schedule {
        #[command(flatten)]
        input: InputOpts,

        /// Maximum packages per CI job
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Package that always gets its own job (repeatable)
        #[arg(long = "isolate", value_name = "PKG")]
        isolate: Vec<String>,

        /// Buildable package prefix (repeatable, replaces the configured list)
        #[arg(long = "prefix", value_name = "PREFIX")]
        prefixes: Vec<String>,

        /// Write the build order listing to this file
        #[arg(long)]
        build_order: Option<PathBuf>,

        /// Emit a CI pipeline (azure, github, gitlab)
        #[arg(long)]
        emit: Option<EmitterKind>,

        /// Target platform for the pipeline
        #[arg(long, default_value = "linux-64")]
        platform: Platform,

        /// Branch whose pushes trigger the pipeline
        #[arg(long, default_value = "buildbranch_linux")]
        trigger_branch: String,

        /// Script file replacing the default build command
        #[arg(long)]
        script: Option<PathBuf>,

        /// Pipeline output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the dependency graph
    Graph {
        #[command(flatten)]
        input: InputOpts,

        /// Buildable package prefix (repeatable, replaces the configured list)
        #[arg(long = "prefix", value_name = "PREFIX")]
        prefixes: Vec<String>,

        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: ExportFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List published packages to rebuild for a migration
    Migrate {
        /// Channel repodata.json
        #[arg(long)]
        repodata: PathBuf,

        /// Migration file listing the packages being migrated
        #[arg(long)]
        migration: PathBuf,

        /// ROS distro name (e.g. humble)
        #[arg(long)]
        distro: String,

        /// Print ROS package names instead of conda names
        #[arg(long)]
        ros_names: bool,
    },

    /// Reduce a recipe to its patched sources for a patch-apply check
    Patches {
        /// Generated recipe to reduce
        #[arg(long, default_value = "recipe.yaml")]
        recipe: PathBuf,

        /// Output file (rewrites the recipe in place, keeping a .bak, if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let global = GlobalOpts {
        config: cli.config,
        json: cli.json,
        no_color: cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Schedule {
            input,
            batch_size,
            isolate,
            prefixes,
            build_order,
            emit,
            platform,
            trigger_branch,
            script,
            output,
        } => commands::schedule::run(
            &global,
            ScheduleArgs {
                input: input.into(),
                overrides: ConfigOverrides {
                    batch_size,
                    isolate,
                    prefixes,
                },
                build_order,
                emit,
                platform,
                trigger_branch,
                script,
                output,
            },
        ),
        Commands::Graph {
            input,
            prefixes,
            format,
            output,
        } => commands::graph::run(&global, &input.into(), prefixes, format, output),
        Commands::Migrate {
            repodata,
            migration,
            distro,
            ros_names,
        } => commands::migrate::run(&global, &repodata, &migration, &distro, ros_names),
        Commands::Patches { recipe, output } => {
            commands::patches::run(&global, &recipe, output.as_deref())
        }
        Commands::Config => commands::config::run(&global),
        Commands::Completions { shell } => commands::completions::run(shell, Cli::command()),
    }
}
