// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;

use buildstage::config::SchedulerConfig;
use buildstage::extract::normalize;
use buildstage::{Scheduler, SchedulerError};
use indexmap::IndexMap;

// Parses arbitrary bytes as a YAML/JSON requirement mapping and schedules it.
// Scheduling must either succeed with every package placed once or report a
// dependency cycle.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(raw) = serde_yaml::from_str::<IndexMap<String, Vec<serde_yaml::Value>>>(text) else {
        return;
    };

    let requirements = normalize(raw);
    let scheduler = Scheduler::new(SchedulerConfig {
        max_batch_size: 2,
        ..SchedulerConfig::default()
    })
    .expect("valid config");

    match scheduler.schedule(&requirements, None) {
        Ok(plan) => {
            assert_eq!(plan.package_count(), requirements.len());
            for stage in &plan.stages {
                for batch in stage.batches() {
                    assert!(!batch.is_empty() && batch.len() <= 2);
                }
            }
        }
        Err(SchedulerError::DependencyCycle { path }) => assert!(path.len() >= 2),
        Err(other) => panic!("unexpected error: {other}"),
    }
});
