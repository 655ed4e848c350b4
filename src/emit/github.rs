// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! GitHub Actions emitter
//!
//! Actions has no stage concept, so barriers are expressed through `needs`:
//! every job waits for all jobs of the previous packed stage.

use super::{mapping, EmitOptions, PipelineEmitter, Platform};
use crate::types::{Batch, BuildPlan};
use serde_yaml::{Mapping, Value};

const TOKEN: &str = "${{ secrets.ANACONDA_API_TOKEN }}";

/// Renders a workflow with one job per batch
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubEmitter;

impl GithubEmitter {
    fn runs_on(platform: Platform) -> &'static str {
        match platform {
            Platform::Linux64 | Platform::EmscriptenWasm32 => "ubuntu-latest",
            Platform::LinuxAarch64 => "ubuntu-24.04-arm",
            Platform::Osx64 => "macos-15-intel",
            Platform::OsxArm64 => "macos-15",
            Platform::Win64 => "windows-2022",
        }
    }

    fn workflow_name(platform: Platform) -> &'static str {
        match platform {
            Platform::Linux64 => "build_linux64",
            Platform::LinuxAarch64 => "build_linux_aarch64",
            Platform::Osx64 => "build_osx64",
            Platform::OsxArm64 => "build_osx_arm64",
            Platform::Win64 => "build_win",
            Platform::EmscriptenWasm32 => "build_emscripten_wasm32",
        }
    }

    fn default_script(platform: Platform) -> &'static str {
        if platform.is_windows() {
            "call .scripts\\build_win.bat"
        } else {
            ".scripts/build_unix.sh"
        }
    }

    fn checkout() -> Value {
        mapping([("name", "Checkout code"), ("uses", "actions/checkout@v4")])
    }

    fn unix_steps(batch: &Batch, script: &str, platform: Platform) -> Vec<Value> {
        let recipes = batch.joined();
        vec![
            Self::checkout(),
            mapping([
                ("name", Value::from(format!("Build {recipes}"))),
                (
                    "env",
                    mapping([
                        ("ANACONDA_API_TOKEN", Value::from(TOKEN)),
                        ("CURRENT_RECIPES", Value::from(recipes.clone())),
                        ("BUILD_TARGET", Value::from(platform.subdir())),
                    ]),
                ),
                ("run", Value::from(script)),
            ]),
        ]
    }

    fn win_steps(batch: &Batch, script: &str) -> Vec<Value> {
        let recipes = batch.joined();
        vec![
            Self::checkout(),
            mapping([
                ("name", Value::from("Setup pixi")),
                ("uses", Value::from("prefix-dev/setup-pixi@v0.8.10")),
                (
                    "with",
                    mapping([("pixi-version", "v0.40.3"), ("cache", "true")]),
                ),
            ]),
            mapping([
                ("uses", Value::from("egor-tensin/cleanup-path@v4")),
                (
                    "with",
                    mapping([(
                        "dirs",
                        "C:\\Program Files\\Git\\usr\\bin;C:\\Program Files\\Git\\bin;C:\\Program Files\\Git\\cmd;C:\\Program Files\\Git\\mingw64\\bin",
                    )]),
                ),
            ]),
            mapping([
                ("shell", Value::from("cmd")),
                ("run", Value::from(script)),
                (
                    "env",
                    mapping([
                        ("ANACONDA_API_TOKEN", Value::from(TOKEN)),
                        ("CURRENT_RECIPES", Value::from(recipes.clone())),
                        ("PYTHONUNBUFFERED", Value::from(1)),
                    ]),
                ),
                ("name", Value::from(format!("Build {recipes}"))),
            ]),
        ]
    }
}

/// Human-readable job name: drops the `ros-<distro>-` part of each package
#[must_use]
pub fn job_display_name(batch: &Batch) -> String {
    batch
        .packages()
        .iter()
        .map(|pkg| {
            let parts: Vec<&str> = pkg.as_str().split('-').collect();
            if parts.len() > 2 {
                parts[2..].join("-")
            } else {
                pkg.as_str().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl PipelineEmitter for GithubEmitter {
    fn name(&self) -> &'static str {
        "github"
    }

    fn file_name(&self, platform: Platform) -> String {
        match platform {
            Platform::Linux64 => "linux.yml".into(),
            Platform::LinuxAarch64 => "linux_aarch64.yml".into(),
            Platform::Osx64 => "osx.yml".into(),
            Platform::OsxArm64 => "osx_arm64.yml".into(),
            Platform::Win64 => "win.yml".into(),
            Platform::EmscriptenWasm32 => "emscripten_wasm32.yml".into(),
        }
    }

    fn render(&self, plan: &BuildPlan, options: &EmitOptions) -> Option<Value> {
        let platform = options.platform;
        let script = options
            .script
            .as_deref()
            .unwrap_or_else(|| Self::default_script(platform));

        let mut jobs = Mapping::new();
        let mut previous: Vec<String> = Vec::new();

        for (i, stage) in plan.stages.iter().enumerate() {
            let mut keys = Vec::new();
            for batch in stage.batches() {
                let key = format!("stage_{i}_job_{}", jobs.len());

                let mut job = Mapping::new();
                job.insert("name".into(), job_display_name(batch).into());
                job.insert("runs-on".into(), Self::runs_on(platform).into());
                job.insert("strategy".into(), mapping([("fail-fast", false)]));
                job.insert("needs".into(), Value::from(previous.clone()));
                if platform.is_windows() {
                    job.insert("env".into(), mapping([("CONDA_BLD_PATH", "C:\\\\bld\\\\")]));
                    job.insert("steps".into(), Value::Sequence(Self::win_steps(batch, script)));
                } else {
                    job.insert(
                        "steps".into(),
                        Value::Sequence(Self::unix_steps(batch, script, platform)),
                    );
                }

                jobs.insert(Value::from(key.clone()), Value::Mapping(job));
                keys.push(key);
            }
            previous = keys;
        }

        if jobs.is_empty() {
            return None;
        }

        Some(mapping([
            ("jobs", Value::Mapping(jobs)),
            ("name", Value::from(Self::workflow_name(platform))),
            (
                "on",
                mapping([(
                    "push",
                    mapping([("branches", vec![options.trigger_branch.clone()])]),
                )]),
            ),
        ]))
    }

    /// Serializes like the default, but writes the trigger key as a bare `on:`
    fn emit(&self, plan: &BuildPlan, options: &EmitOptions) -> serde_yaml::Result<Option<String>> {
        let Some(doc) = self.render(plan, options) else {
            return Ok(None);
        };
        let text = serde_yaml::to_string(&doc)?;
        let fixed: Vec<&str> = text
            .lines()
            .map(|line| match line {
                "'on':" | "\"on\":" => "on:",
                other => other,
            })
            .collect();
        Ok(Some(fixed.join("\n") + "\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PackageName, PackedStage};

    fn batch(names: &[&str]) -> Batch {
        Batch(names.iter().map(|n| PackageName::from(*n)).collect())
    }

    fn plan() -> BuildPlan {
        BuildPlan {
            levels: vec![],
            stages: vec![
                PackedStage(vec![batch(&["ros-humble-a"]), batch(&["ros-humble-b"])]),
                PackedStage(vec![batch(&["ros-humble-c", "ros-humble-d"])]),
            ],
        }
    }

    fn options(platform: Platform) -> EmitOptions {
        EmitOptions {
            trigger_branch: "main".into(),
            platform,
            script: None,
        }
    }

    #[test]
    fn test_job_display_name() {
        assert_eq!(
            job_display_name(&batch(&["ros-humble-robot-state-publisher", "python"])),
            "robot-state-publisher python"
        );
    }

    #[test]
    fn test_jobs_need_previous_stage() {
        let doc = GithubEmitter.render(&plan(), &options(Platform::Linux64)).unwrap();
        let jobs = doc["jobs"].as_mapping().unwrap();
        let keys: Vec<&str> = jobs.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["stage_0_job_0", "stage_0_job_1", "stage_1_job_2"]);

        assert_eq!(doc["jobs"]["stage_0_job_0"]["needs"], Value::Sequence(vec![]));
        assert_eq!(
            doc["jobs"]["stage_1_job_2"]["needs"],
            Value::from(vec!["stage_0_job_0", "stage_0_job_1"])
        );
        assert_eq!(doc["jobs"]["stage_1_job_2"]["name"], Value::from("c d"));
        assert_eq!(
            doc["jobs"]["stage_1_job_2"]["steps"][1]["env"]["CURRENT_RECIPES"],
            Value::from("ros-humble-c ros-humble-d")
        );
        assert_eq!(doc["name"], Value::from("build_linux64"));
    }

    #[test]
    fn test_on_key_is_bare() {
        let text = GithubEmitter.emit(&plan(), &options(Platform::OsxArm64)).unwrap().unwrap();
        assert!(text.lines().any(|l| l == "on:"));
        assert!(text.contains("macos-15"));

        let doc: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(doc["on"]["push"]["branches"][0], Value::from("main"));
    }

    #[test]
    fn test_windows_steps() {
        let doc = GithubEmitter.render(&plan(), &options(Platform::Win64)).unwrap();
        let job = &doc["jobs"]["stage_0_job_0"];
        assert_eq!(job["runs-on"], Value::from("windows-2022"));
        assert_eq!(job["steps"].as_sequence().unwrap().len(), 4);
        assert_eq!(job["steps"][3]["shell"], Value::from("cmd"));
    }
}
