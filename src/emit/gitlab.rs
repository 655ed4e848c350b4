// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! GitLab CI emitter
//!
//! GitLab jobs build a single package each, so this emitter follows the
//! leveled stages rather than the merged batches: a merged batch relies on
//! sequential execution inside one job, which per-package jobs do not have.

use super::{mapping, EmitOptions, PipelineEmitter, Platform};
use crate::types::BuildPlan;
use serde_yaml::{Mapping, Value};

/// Renders one GitLab job per package, grouped into leveled stages
#[derive(Debug, Clone, Copy, Default)]
pub struct GitlabEmitter;

impl GitlabEmitter {
    fn image(platform: Platform) -> &'static str {
        match platform {
            Platform::LinuxAarch64 => "condaforge/linux-anvil-aarch64",
            _ => "condaforge/linux-anvil-cos7-x86_64",
        }
    }
}

impl PipelineEmitter for GitlabEmitter {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn file_name(&self, _platform: Platform) -> String {
        ".gitlab-ci.yml".into()
    }

    fn render(&self, plan: &BuildPlan, options: &EmitOptions) -> Option<Value> {
        let script = options.script.as_deref().unwrap_or(".scripts/build_linux.sh");

        let mut doc = Mapping::new();
        doc.insert("image".into(), Self::image(options.platform).into());

        let mut stage_names = Vec::new();
        for (i, level) in plan.levels.iter().enumerate() {
            if level.is_empty() {
                continue;
            }
            let stage_name = format!("stage_{i}");
            for pkg in level {
                let job = mapping([
                    ("stage", Value::from(stage_name.clone())),
                    (
                        "script",
                        Value::from(vec![
                            "export FEEDSTOCK_ROOT=\"$CI_BUILDS_DIR\"",
                            "export GIT_BRANCH=$CI_COMMIT_REF_NAME",
                            "export RECIPE_ROOT=\"$FEEDSTOCK_ROOT/recipe\"",
                            script,
                        ]),
                    ),
                    ("variables", mapping([("CURRENT_BUILD_PKG_NAME", pkg.as_str())])),
                ]);
                doc.insert(Value::from(pkg.as_str()), job);
            }
            stage_names.push(stage_name);
        }

        if stage_names.is_empty() {
            return None;
        }

        doc.insert("stages".into(), Value::from(stage_names));
        Some(Value::Mapping(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Batch, PackageName, PackedStage};

    #[test]
    fn test_jobs_follow_levels() {
        let a = PackageName::from("ros-noetic-a");
        let b = PackageName::from("ros-noetic-b");
        let plan = BuildPlan {
            levels: vec![vec![a.clone()], vec![b.clone()]],
            stages: vec![PackedStage(vec![Batch(vec![a, b])])],
        };
        let options = EmitOptions {
            trigger_branch: "main".into(),
            platform: Platform::Linux64,
            script: None,
        };

        let text = GitlabEmitter.emit(&plan, &options).unwrap().unwrap();
        let doc: Value = serde_yaml::from_str(&text).unwrap();

        assert_eq!(doc["image"], Value::from("condaforge/linux-anvil-cos7-x86_64"));
        assert_eq!(doc["ros-noetic-a"]["stage"], Value::from("stage_0"));
        assert_eq!(doc["ros-noetic-b"]["stage"], Value::from("stage_1"));
        assert_eq!(
            doc["ros-noetic-b"]["variables"]["CURRENT_BUILD_PKG_NAME"],
            Value::from("ros-noetic-b")
        );
        assert_eq!(doc["stages"], Value::from(vec!["stage_0", "stage_1"]));
        assert_eq!(GitlabEmitter.file_name(Platform::Win64), ".gitlab-ci.yml");
    }
}
