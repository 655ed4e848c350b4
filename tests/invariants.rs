// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the scheduling pipeline
//!
//! These tests verify critical invariants:
//! 1. Dependency order - nothing builds before what it requires
//! 2. Completeness - every requested package is scheduled exactly once
//! 3. Batch bounds - no job exceeds the configured size
//! 4. Determinism - the same input always yields the same plan

use buildstage::config::SchedulerConfig;
use buildstage::extract::PrefixClassifier;
use buildstage::graph::DependencyGraph;
use buildstage::level::{level, level_ordered};
use buildstage::types::{BuildPlan, PackageName, RequirementMap};
use buildstage::{Scheduler, SchedulerError};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashMap;

// =============================================================================
// Test Helpers
// =============================================================================

fn reqs(entries: &[(&str, &[&str])]) -> RequirementMap {
    entries
        .iter()
        .map(|(pkg, deps)| {
            (
                PackageName::from(*pkg),
                deps.iter().map(|d| (*d).to_string()).collect(),
            )
        })
        .collect()
}

fn scheduler(max_batch_size: usize, always_isolated: &[&str]) -> Scheduler {
    Scheduler::new(SchedulerConfig {
        max_batch_size,
        always_isolated: always_isolated.iter().map(|s| (*s).to_string()).collect(),
        buildable_prefixes: vec!["ros-".to_string()],
    })
    .expect("valid config")
}

fn name(i: usize) -> String {
    format!("ros-pkg-{i}")
}

/// Random DAG: package `i` may only depend on packages `< i`, plus an
/// external requirement now and then
fn dag_from(edges: &[Vec<Index>]) -> RequirementMap {
    edges
        .iter()
        .enumerate()
        .map(|(i, deps)| {
            let mut list: Vec<String> = if i == 0 {
                Vec::new()
            } else {
                deps.iter().map(|d| name(d.index(i))).collect()
            };
            if i % 3 == 0 {
                list.push("python >=3.10".to_string());
            }
            (PackageName::new(name(i)), list)
        })
        .collect()
}

fn dag_strategy() -> impl Strategy<Value = RequirementMap> {
    proptest::collection::vec(proptest::collection::vec(any::<Index>(), 0..4), 1..24)
        .prop_map(|edges| dag_from(&edges))
}

/// (packed stage, batch, position) of each package
fn positions(plan: &BuildPlan) -> HashMap<String, (usize, usize, usize)> {
    let mut out = HashMap::new();
    for (s, stage) in plan.stages.iter().enumerate() {
        for (b, batch) in stage.batches().iter().enumerate() {
            for (p, pkg) in batch.packages().iter().enumerate() {
                out.insert(pkg.as_str().to_string(), (s, b, p));
            }
        }
    }
    out
}

fn level_of(plan: &BuildPlan) -> HashMap<String, usize> {
    plan.levels
        .iter()
        .enumerate()
        .flat_map(|(i, stage)| stage.iter().map(move |p| (p.as_str().to_string(), i)))
        .collect()
}

fn direct_deps(map: &RequirementMap) -> Vec<(String, String)> {
    map.iter()
        .flat_map(|(pkg, deps)| {
            deps.iter()
                .filter(|d| d.starts_with("ros-"))
                .map(move |d| (pkg.as_str().to_string(), d.clone()))
        })
        .collect()
}

fn names_of(plan: &BuildPlan) -> Vec<Vec<Vec<String>>> {
    plan.stages
        .iter()
        .map(|stage| {
            stage
                .batches()
                .iter()
                .map(|b| b.packages().iter().map(|p| p.as_str().to_string()).collect())
                .collect()
        })
        .collect()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn levels_respect_dependencies(map in dag_strategy()) {
        let plan = scheduler(5, &[]).schedule(&map, None).expect("acyclic");
        let levels = level_of(&plan);

        for (pkg, dep) in direct_deps(&map) {
            prop_assert!(levels[&dep] < levels[&pkg], "{} must come after {}", pkg, dep);
        }
    }

    #[test]
    fn packed_plan_respects_dependencies(
        map in dag_strategy(),
        max in 1usize..7,
        isolate in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let isolated: Vec<String> = (0..map.len())
            .filter(|i| isolate[*i])
            .map(name)
            .collect();
        let isolated: Vec<&str> = isolated.iter().map(String::as_str).collect();
        let plan = scheduler(max, &isolated).schedule(&map, None).expect("acyclic");
        let pos = positions(&plan);

        for (pkg, dep) in direct_deps(&map) {
            let (ps, pb, pp) = pos[&pkg];
            let (ds, db, dp) = pos[&dep];
            let ordered = ds < ps || (ds == ps && db == pb && dp < pp);
            prop_assert!(
                ordered,
                "{} at {:?} vs dependency {} at {:?}",
                pkg, pos[&pkg], dep, pos[&dep]
            );
        }
    }

    #[test]
    fn every_package_scheduled_once(map in dag_strategy(), max in 1usize..7) {
        let plan = scheduler(max, &[]).schedule(&map, None).expect("acyclic");

        let mut packed: Vec<String> = plan
            .stages
            .iter()
            .flat_map(|s| s.batches().iter())
            .flat_map(|b| b.packages().iter())
            .map(|p| p.as_str().to_string())
            .collect();
        let mut leveled: Vec<String> = plan.build_order().map(|p| p.as_str().to_string()).collect();
        let mut expected: Vec<String> = map.keys().map(|p| p.as_str().to_string()).collect();

        packed.sort();
        leveled.sort();
        expected.sort();
        prop_assert_eq!(&packed, &expected);
        prop_assert_eq!(&leveled, &expected);
    }

    #[test]
    fn batches_are_bounded(
        map in dag_strategy(),
        max in 1usize..7,
        isolate in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let isolated: Vec<String> = (0..map.len())
            .filter(|i| isolate[*i])
            .map(name)
            .collect();
        let isolated_refs: Vec<&str> = isolated.iter().map(String::as_str).collect();
        let plan = scheduler(max, &isolated_refs).schedule(&map, None).expect("acyclic");

        for stage in &plan.stages {
            prop_assert!(!stage.batches().is_empty());
            for batch in stage.batches() {
                prop_assert!(!batch.is_empty());
                prop_assert!(batch.len() <= max);
                for pkg in batch.packages() {
                    if isolated.iter().any(|i| i == pkg.as_str()) {
                        prop_assert_eq!(batch.len(), 1);
                        prop_assert_eq!(stage.batches().len(), 1);
                    }
                }
            }
        }
    }

    #[test]
    fn scheduling_is_deterministic(map in dag_strategy(), max in 1usize..7) {
        let s = scheduler(max, &[]);
        let first = s.schedule(&map, None).expect("acyclic");
        let second = s.schedule(&map, None).expect("acyclic");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn releveling_build_order_is_stable(map in dag_strategy()) {
        let classifier = PrefixClassifier::new(["ros-"]);
        let graph = DependencyGraph::build(&map, &classifier);
        let first = level(&graph, &map, &classifier, None).expect("acyclic");
        let again = level_ordered(first.build_order(), &map, &classifier);
        prop_assert_eq!(first.stages, again.stages);
    }

    #[test]
    fn subset_respects_dependencies(
        map in dag_strategy(),
        keep in proptest::collection::vec(any::<bool>(), 24),
    ) {
        let names: Vec<PackageName> = map
            .keys()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .map(|(_, p)| p.clone())
            .collect();
        let plan = scheduler(3, &[]).schedule(&map, Some(names.as_slice())).expect("acyclic");

        let mut scheduled: Vec<&str> = plan.build_order().map(PackageName::as_str).collect();
        let mut wanted: Vec<&str> = names.iter().map(PackageName::as_str).collect();
        scheduled.sort_unstable();
        wanted.sort_unstable();
        prop_assert_eq!(scheduled, wanted);
    }
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_linear_chain_is_one_merged_job() {
    let map = reqs(&[
        ("ros-a", &[]),
        ("ros-b", &["ros-a"]),
        ("ros-c", &["ros-b"]),
    ]);
    let plan = scheduler(5, &[]).schedule(&map, None).unwrap();

    assert_eq!(plan.levels.len(), 3);
    assert_eq!(names_of(&plan), vec![vec![vec!["ros-a", "ros-b", "ros-c"]]]);
}

#[test]
fn test_wide_level_is_chunked() {
    let map = reqs(&[("ros-p1", &[]), ("ros-p2", &[]), ("ros-p3", &[])]);
    let plan = scheduler(2, &[]).schedule(&map, None).unwrap();

    // independent siblings come out in reversed mapping order
    assert_eq!(
        names_of(&plan),
        vec![vec![vec!["ros-p3", "ros-p2"], vec!["ros-p1"]]]
    );
}

#[test]
fn test_isolated_package_gets_own_stage() {
    let map = reqs(&[("ros-p1", &[]), ("ros-p2", &[]), ("ros-p3", &[])]);
    let plan = scheduler(2, &["ros-p2"]).schedule(&map, None).unwrap();

    assert_eq!(
        names_of(&plan),
        vec![vec![vec!["ros-p2"]], vec![vec!["ros-p3", "ros-p1"]]]
    );
}

#[test]
fn test_isolated_dependent_waits_for_carry() {
    let map = reqs(&[("ros-base", &[]), ("ros-heavy", &["ros-base"])]);
    let plan = scheduler(5, &["ros-heavy"]).schedule(&map, None).unwrap();

    assert_eq!(
        names_of(&plan),
        vec![vec![vec!["ros-base"]], vec![vec!["ros-heavy"]]]
    );
}

#[test]
fn test_external_requirements_do_not_stage() {
    let map = reqs(&[
        ("ros-a", &["cmake", "python >=3.10"]),
        ("ros-b", &["ros-a >=1.0", "numpy"]),
    ]);
    let plan = scheduler(1, &[]).schedule(&map, None).unwrap();

    assert_eq!(plan.levels.len(), 2);
    assert_eq!(
        names_of(&plan),
        vec![vec![vec!["ros-a"]], vec![vec!["ros-b"]]]
    );
}

#[test]
fn test_cycle_is_reported() {
    let map = reqs(&[("ros-a", &["ros-b"]), ("ros-b", &["ros-a"])]);
    let err = scheduler(5, &[]).schedule(&map, None).unwrap_err();

    assert!(matches!(err, SchedulerError::DependencyCycle { .. }));
    let message = err.to_string();
    assert!(message.contains("ros-a"));
    assert!(message.contains("ros-b"));
}

#[test]
fn test_empty_mapping_yields_empty_plan() {
    let plan = scheduler(5, &[]).schedule(&RequirementMap::new(), None).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.job_count(), 0);
}
