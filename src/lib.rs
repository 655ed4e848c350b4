// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Buildstage library - dependency-aware build staging for conda recipes
//!
//! This crate turns a `package -> requirements` mapping into an ordered
//! build plan: stages of size-bounded batches where every package builds
//! strictly after the packages it depends on. Plans can be rendered as CI
//! pipeline definitions or as a flat build-order listing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod graph;
pub mod level;
pub mod migrate;
pub mod pack;
pub mod patches;
pub mod recipes;
pub mod scheduler;

pub use error::SchedulerError;
pub use scheduler::Scheduler;

/// Core data types shared by every stage of the scheduling pipeline
pub mod types {
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use std::fmt;

    // =========================================================================
    // Package Names
    // =========================================================================

    /// Opaque package identifier, e.g. `ros-humble-rclcpp`
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PackageName(String);

    impl PackageName {
        /// Wrap a raw name
        #[must_use]
        pub fn new(name: impl Into<String>) -> Self {
            Self(name.into())
        }

        /// Borrow the raw name
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for PackageName {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<&str> for PackageName {
        fn from(s: &str) -> Self {
            Self(s.to_string())
        }
    }

    impl From<String> for PackageName {
        fn from(s: String) -> Self {
            Self(s)
        }
    }

    impl AsRef<str> for PackageName {
        fn as_ref(&self) -> &str {
            &self.0
        }
    }

    impl std::borrow::Borrow<str> for PackageName {
        fn borrow(&self) -> &str {
            &self.0
        }
    }

    /// Whether a requirement is produced by this pipeline or fetched prebuilt
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum PackageKind {
        /// Built by this pipeline; participates in ordering
        Buildable,
        /// Provided externally; never scheduled
        External,
    }

    /// Normalized requirement mapping, in insertion order
    pub type RequirementMap = IndexMap<PackageName, Vec<String>>;

    // =========================================================================
    // Plan Structure
    // =========================================================================

    /// Packages sharing one dependency level
    pub type Stage = Vec<PackageName>;

    /// A size-bounded group of packages built by a single CI job
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Batch(pub Vec<PackageName>);

    impl Batch {
        /// Packages in build order
        #[must_use]
        pub fn packages(&self) -> &[PackageName] {
            &self.0
        }

        /// Number of packages in the batch
        #[must_use]
        pub fn len(&self) -> usize {
            self.0.len()
        }

        /// True if the batch holds no packages
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// Space separated member list, as passed to build scripts
        #[must_use]
        pub fn joined(&self) -> String {
            self.0
                .iter()
                .map(PackageName::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    /// A CI barrier: every batch inside may run concurrently
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PackedStage(pub Vec<Batch>);

    impl PackedStage {
        /// Batches of this stage
        #[must_use]
        pub fn batches(&self) -> &[Batch] {
            &self.0
        }
    }

    /// The final, immutable output of one scheduling run
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BuildPlan {
        /// Leveled stages before packing
        pub levels: Vec<Stage>,
        /// Packed stages consumed by pipeline emitters
        pub stages: Vec<PackedStage>,
    }

    impl BuildPlan {
        /// True if nothing needs to be built
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.levels.iter().all(Vec::is_empty)
        }

        /// Number of packages scheduled
        #[must_use]
        pub fn package_count(&self) -> usize {
            self.levels.iter().map(Vec::len).sum()
        }

        /// Number of CI jobs the packed plan produces
        #[must_use]
        pub fn job_count(&self) -> usize {
            self.stages.iter().map(|s| s.0.len()).sum()
        }

        /// Leveled packages flattened into a single build order
        pub fn build_order(&self) -> impl Iterator<Item = &PackageName> {
            self.levels.iter().flatten()
        }
    }
}
