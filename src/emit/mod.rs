// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Pipeline emitters - render a build plan as CI configuration
//!
//! Every emitter consumes the same `BuildPlan`; only the output format
//! differs. Each packed stage becomes a CI barrier and each batch one job.

pub mod azure;
pub mod github;
pub mod gitlab;

use crate::types::BuildPlan;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

pub use azure::AzureEmitter;
pub use github::GithubEmitter;
pub use gitlab::GitlabEmitter;

// =============================================================================
// Platforms
// =============================================================================

/// Conda target platforms a pipeline can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// linux-64
    Linux64,
    /// linux-aarch64
    LinuxAarch64,
    /// osx-64
    Osx64,
    /// osx-arm64
    OsxArm64,
    /// win-64
    Win64,
    /// emscripten-wasm32
    EmscriptenWasm32,
}

impl Platform {
    /// All supported platforms
    pub const ALL: [Platform; 6] = [
        Self::Linux64,
        Self::LinuxAarch64,
        Self::Osx64,
        Self::OsxArm64,
        Self::Win64,
        Self::EmscriptenWasm32,
    ];

    /// Conda subdir name
    #[must_use]
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Linux64 => "linux-64",
            Self::LinuxAarch64 => "linux-aarch64",
            Self::Osx64 => "osx-64",
            Self::OsxArm64 => "osx-arm64",
            Self::Win64 => "win-64",
            Self::EmscriptenWasm32 => "emscripten-wasm32",
        }
    }

    /// True for the Windows target
    #[must_use]
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Win64)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdir())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.subdir() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(Platform::subdir).collect();
                format!("Unknown platform: {s}. Valid: {}", valid.join(", "))
            })
    }
}

// =============================================================================
// Emitter Interface
// =============================================================================

/// Settings shared by all emitters
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Branch whose pushes trigger the pipeline
    pub trigger_branch: String,
    /// Target platform
    pub platform: Platform,
    /// Build script body; each emitter has a per-platform default
    pub script: Option<String>,
}

/// Strategy interface for CI output formats
pub trait PipelineEmitter {
    /// Short identifier (`azure`, `github`, `gitlab`)
    fn name(&self) -> &'static str;

    /// Conventional output file name for a platform
    fn file_name(&self, platform: Platform) -> String;

    /// Build the pipeline document, or `None` if there are no jobs
    fn render(&self, plan: &BuildPlan, options: &EmitOptions) -> Option<Value>;

    /// Render and serialize to YAML text
    fn emit(&self, plan: &BuildPlan, options: &EmitOptions) -> serde_yaml::Result<Option<String>> {
        self.render(plan, options)
            .map(|doc| serde_yaml::to_string(&doc))
            .transpose()
    }
}

/// Selectable output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterKind {
    /// Azure Pipelines
    Azure,
    /// GitHub Actions
    Github,
    /// GitLab CI
    Gitlab,
}

impl EmitterKind {
    /// Instantiate the emitter
    #[must_use]
    pub fn emitter(self) -> Box<dyn PipelineEmitter> {
        match self {
            Self::Azure => Box::new(AzureEmitter),
            Self::Github => Box::new(GithubEmitter),
            Self::Gitlab => Box::new(GitlabEmitter),
        }
    }
}

impl FromStr for EmitterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" | "azure-pipelines" => Ok(Self::Azure),
            "github" | "gha" | "github-actions" => Ok(Self::Github),
            "gitlab" | "gitlab-ci" => Ok(Self::Gitlab),
            _ => Err(format!("Unknown emitter: {s}. Valid: azure, github, gitlab")),
        }
    }
}

/// Build order listing: one package per line, leveled order
#[must_use]
pub fn build_order(plan: &BuildPlan) -> String {
    plan.build_order()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ordered YAML mapping from key/value pairs
pub(crate) fn mapping<I, V>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(Value::from(key), value.into());
    }
    Value::Mapping(map)
}
