// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Azure Pipelines emitter

use super::{mapping, EmitOptions, PipelineEmitter, Platform};
use crate::types::{Batch, BuildPlan};
use serde_yaml::Value;

/// Renders one Azure stage per packed stage, one job per batch
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureEmitter;

impl AzureEmitter {
    fn pool(platform: Platform) -> Value {
        match platform {
            Platform::LinuxAarch64 => mapping([
                ("name", Value::from("Default")),
                (
                    "demands",
                    Value::from(vec![
                        "Agent.OS -equals linux",
                        "Agent.OSArchitecture -equals ARM64",
                    ]),
                ),
            ]),
            Platform::Linux64 | Platform::EmscriptenWasm32 => {
                mapping([("vmImage", "ubuntu-latest")])
            }
            Platform::Osx64 => mapping([("vmImage", "macOS-10.15")]),
            Platform::OsxArm64 => mapping([("vmImage", "macOS-11")]),
            Platform::Win64 => mapping([("vmImage", "windows-2019")]),
        }
    }

    fn docker_image(platform: Platform) -> Option<&'static str> {
        match platform {
            Platform::Linux64 => Some("condaforge/linux-anvil-cos7-x86_64"),
            Platform::LinuxAarch64 => Some("condaforge/linux-anvil-aarch64"),
            _ => None,
        }
    }

    fn default_script(platform: Platform) -> &'static str {
        match platform {
            Platform::Linux64 | Platform::LinuxAarch64 | Platform::EmscriptenWasm32 => {
                ".scripts/build_linux.sh"
            }
            Platform::Osx64 => ".scripts/build_osx.sh",
            Platform::OsxArm64 => ".scripts/build_osx_arm64.sh",
            Platform::Win64 => "call .scripts\\build_win.bat",
        }
    }

    fn unix_job(key: String, batch: &Batch, script: &str, platform: Platform) -> Value {
        let recipes = batch.joined();
        let mut env = vec![
            ("ANACONDA_API_TOKEN", Value::from("$(ANACONDA_API_TOKEN)")),
            ("CURRENT_RECIPES", Value::from(recipes.clone())),
        ];
        if let Some(image) = Self::docker_image(platform) {
            env.push(("DOCKER_IMAGE", Value::from(image)));
        }

        mapping([
            ("job", Value::from(key)),
            (
                "steps",
                Value::Sequence(vec![mapping([
                    ("script", Value::from(script)),
                    ("env", mapping(env)),
                    ("displayName", Value::from(format!("Build {recipes}"))),
                ])]),
            ),
        ])
    }

    fn win_job(key: String, batch: &Batch, script: &str) -> Value {
        let recipes = batch.joined();
        mapping([
            ("job", Value::from(key)),
            ("variables", mapping([("CONDA_BLD_PATH", "C:\\\\bld\\\\")])),
            (
                "steps",
                Value::Sequence(vec![
                    mapping([
                        (
                            "powershell",
                            "Invoke-WebRequest -Uri https://github.com/conda-forge/miniforge/releases/latest/download/Miniforge3-Windows-x86_64.exe -OutFile $(Build.ArtifactStagingDirectory)\\Miniforge.exe",
                        ),
                        ("displayName", "Download Miniforge"),
                    ]),
                    mapping([
                        (
                            "script",
                            "start /wait \"\" %BUILD_ARTIFACTSTAGINGDIRECTORY%\\Miniforge.exe /InstallationType=JustMe /RegisterPython=0 /S /D=C:\\Miniforge",
                        ),
                        ("displayName", "Install Miniforge"),
                    ]),
                    mapping([
                        (
                            "powershell",
                            "Write-Host \"##vso[task.prependpath]C:\\Miniforge\\Scripts\"",
                        ),
                        ("displayName", "Add conda to PATH"),
                    ]),
                    mapping([
                        ("script", Value::from(script)),
                        (
                            "env",
                            mapping([
                                ("ANACONDA_API_TOKEN", Value::from("$(ANACONDA_API_TOKEN)")),
                                ("CURRENT_RECIPES", Value::from(recipes.clone())),
                                ("PYTHONUNBUFFERED", Value::from(1)),
                            ]),
                        ),
                        ("displayName", Value::from(format!("Build {recipes}"))),
                    ]),
                ]),
            ),
        ])
    }
}

impl PipelineEmitter for AzureEmitter {
    fn name(&self) -> &'static str {
        "azure"
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
        let script = options
            .script
            .as_deref()
            .unwrap_or_else(|| Self::default_script(options.platform));

        let mut stages = Vec::new();
        for (i, stage) in plan.stages.iter().enumerate() {
            let jobs: Vec<Value> = stage
                .batches()
                .iter()
                .enumerate()
                .map(|(j, batch)| {
                    let key = format!("stage_{i}_job_{j}");
                    if options.platform.is_windows() {
                        Self::win_job(key, batch, script)
                    } else {
                        Self::unix_job(key, batch, script, options.platform)
                    }
                })
                .collect();

            if !jobs.is_empty() {
                stages.push(mapping([
                    ("stage", Value::from(format!("stage_{i}"))),
                    ("jobs", Value::Sequence(jobs)),
                ]));
            }
        }

        if stages.is_empty() {
            return None;
        }

        Some(mapping([
            ("pool", Self::pool(options.platform)),
            ("trigger", Value::from(vec![options.trigger_branch.clone()])),
            ("pr", Value::from("none")),
            ("stages", Value::Sequence(stages)),
        ]))
    }
}
