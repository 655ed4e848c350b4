// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then a config file (TOML, YAML or
//! JSON), then `BUILDSTAGE_*` environment variables. CLI flags are applied on
//! top by the command layer. A `vinca.yaml` works as a config file as-is:
//! its `build_in_own_azure_stage` list is read as `always_isolated` and the
//! unrelated keys are ignored.

use crate::error::{Result, SchedulerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default upper bound on packages per CI job
pub const DEFAULT_MAX_BATCH_SIZE: usize = 5;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "BUILDSTAGE";

/// Scheduler configuration, passed explicitly into every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum packages per batch
    pub max_batch_size: usize,
    /// Packages that always get a batch of their own
    #[serde(alias = "build_in_own_azure_stage")]
    pub always_isolated: Vec<String>,
    /// Name prefixes marking a requirement as built by this pipeline
    pub buildable_prefixes: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            always_isolated: Vec::new(),
            buildable_prefixes: vec!["ros-".to_string(), "ros2-".to_string()],
        }
    }
}

impl SchedulerConfig {
    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(SchedulerError::InvalidBatchSize(self.max_batch_size));
        }
        if self.buildable_prefixes.iter().all(|p| p.is_empty()) {
            return Err(SchedulerError::NoBuildablePrefixes);
        }
        Ok(())
    }
}

/// Default config file location (`buildstage.toml` in the platform config dir)
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "hyperpolymath", "buildstage")
        .map(|d| d.config_dir().join("buildstage.toml"))
}

/// Load configuration from disk and environment, falling back to defaults
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&Path>) -> Result<SchedulerConfig> {
    let mut builder = config::Config::builder();

    match path {
        Some(p) => {
            tracing::debug!("Loading config from {}", p.display());
            builder = builder.add_source(config::File::from(p).required(true));
        }
        None => {
            if let Some(p) = default_path() {
                builder = builder.add_source(config::File::from(p).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("always_isolated")
            .with_list_parse_key("buildable_prefixes"),
    );

    let cfg: SchedulerConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
