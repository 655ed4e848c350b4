// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Scheduling entry point

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::extract::PrefixClassifier;
use crate::graph::DependencyGraph;
use crate::level::level;
use crate::pack::{pack, PackOptions};
use crate::types::{BuildPlan, PackageName, RequirementMap};

/// Computes build plans under one configuration
///
/// Holds no state between runs; every call to `schedule` works from its
/// own snapshot of the requirement mapping.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    classifier: PrefixClassifier,
}

impl Scheduler {
    /// Create a scheduler, validating the configuration up front
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let classifier = PrefixClassifier::new(config.buildable_prefixes.iter().cloned());
        Ok(Self { config, classifier })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Classifier derived from the configured prefixes
    #[must_use]
    pub fn classifier(&self) -> &PrefixClassifier {
        &self.classifier
    }

    /// Build the dependency graph for a requirement mapping
    #[must_use]
    pub fn graph(&self, requirements: &RequirementMap) -> DependencyGraph {
        DependencyGraph::build(requirements, &self.classifier)
    }

    /// Compute the build plan
    ///
    /// `names_to_build` restricts the run to a subset of the mapping's keys;
    /// `None` schedules all of them.
    pub fn schedule(
        &self,
        requirements: &RequirementMap,
        names_to_build: Option<&[PackageName]>,
    ) -> Result<BuildPlan> {
        let graph = self.graph(requirements);
        let leveling = level(&graph, requirements, &self.classifier, names_to_build)?;

        let stages = pack(
            &leveling.stages,
            &PackOptions {
                max_batch_size: self.config.max_batch_size,
                always_isolated: &self.config.always_isolated,
            },
        )?;

        let plan = BuildPlan {
            levels: leveling.stages,
            stages,
        };

        tracing::info!(
            "Scheduled {} packages in {} levels, {} CI stages, {} jobs",
            plan.package_count(),
            plan.levels.len(),
            plan.stages.len(),
            plan.job_count()
        );

        Ok(plan)
    }
}
