// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for the scheduling core

use thiserror::Error;

/// Errors raised while configuring or running the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Batches must hold at least one package
    #[error("max_batch_size must be greater than zero (got {0})")]
    InvalidBatchSize(usize),

    /// The buildable-name classifier needs at least one prefix
    #[error("at least one buildable package prefix is required")]
    NoBuildablePrefixes,

    /// The requirement mapping contains a dependency cycle
    #[error("dependency cycle detected: {}", .path.join(" -> "))]
    DependencyCycle {
        /// Packages along the cycle, first element repeated at the end
        path: Vec<String>,
    },

    /// A recipe has no `source` section
    #[error("recipe has no source section")]
    MissingSource,

    /// Configuration could not be loaded
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// Input file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: std::path::PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Input file could not be parsed
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed
        path: std::path::PathBuf,
        /// Underlying parse error
        source: serde_yaml::Error,
    },

    /// JSON input (repodata) could not be parsed
    #[error("failed to parse {path}: {source}")]
    Json {
        /// File that failed
        path: std::path::PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },
}

/// Result alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
