//! Glint scene file handling

use anyhow::{Context, Result};
use glint_animation::{
    AnimationDescriptor, DescriptorError, Interpolator, PresetSpec, RangeMismatchError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Default scene file name looked up inside a directory
pub const SCENE_FILE: &str = "glint.toml";

/// Top-level scene (glint.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct SceneConfig {
    pub scene: SceneMeta,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default, rename = "value")]
    pub values: Vec<ValueConfig>,
}

/// Scene metadata
#[derive(Debug, Deserialize, Serialize)]
pub struct SceneMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Headless run settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Frames to drive
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Fixed delta per frame
    #[serde(default = "default_tick_ms")]
    pub tick_ms: f64,
    /// Record values every N frames (the last frame is always recorded)
    #[serde(default = "default_sample_every")]
    pub sample_every: u32,
    /// Per-tick delta clamp handed to the driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dt_ms: Option<f64>,
}

fn default_frames() -> u32 {
    120
}

fn default_tick_ms() -> f64 {
    16.0
}

fn default_sample_every() -> u32 {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            tick_ms: default_tick_ms(),
            sample_every: default_sample_every(),
            max_dt_ms: None,
        }
    }
}

/// One animated value
#[derive(Debug, Deserialize, Serialize)]
pub struct ValueConfig {
    pub name: String,
    #[serde(default)]
    pub initial: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<PresetSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationDescriptor<f32>>,
    /// Report the value mapped through these ranges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    pub input: Vec<f32>,
    pub output: Vec<f32>,
}

/// Problems `glint check` reports, one per value
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("value '{0}' is declared more than once")]
    DuplicateName(String),
    #[error("value '{0}' needs either `preset` or `animation`")]
    MissingAnimation(String),
    #[error("value '{0}' sets both `preset` and `animation`")]
    ConflictingAnimation(String),
    #[error("value '{name}': {source}")]
    Descriptor {
        name: String,
        #[source]
        source: DescriptorError,
    },
    #[error("value '{name}' map: {source}")]
    Map {
        name: String,
        #[source]
        source: RangeMismatchError,
    },
}

impl ValueConfig {
    /// The descriptor to attach, from either `preset` or `animation`
    pub fn descriptor(&self) -> Result<AnimationDescriptor<f32>, SceneError> {
        let descriptor = match (&self.preset, &self.animation) {
            (Some(preset), None) => preset.descriptor(),
            (None, Some(animation)) => animation.clone(),
            (None, None) => return Err(SceneError::MissingAnimation(self.name.clone())),
            (Some(_), Some(_)) => return Err(SceneError::ConflictingAnimation(self.name.clone())),
        };
        descriptor
            .validate()
            .map_err(|source| SceneError::Descriptor {
                name: self.name.clone(),
                source,
            })?;
        Ok(descriptor)
    }

    pub fn interpolator(&self) -> Result<Option<Interpolator<f32>>, SceneError> {
        let Some(map) = &self.map else {
            return Ok(None);
        };
        Interpolator::new(map.input.clone(), map.output.clone())
            .map(Some)
            .map_err(|source| SceneError::Map {
                name: self.name.clone(),
                source,
            })
    }
}

impl SceneConfig {
    /// Load a scene from a file, or from `glint.toml` inside a directory
    pub fn load_from_dir(path: &Path) -> Result<Self> {
        let scene_path = if path.is_file() {
            path.to_path_buf()
        } else {
            path.join(SCENE_FILE)
        };

        if !scene_path.exists() {
            anyhow::bail!(
                "No {} found in {}. Run `glint init` to create one.",
                SCENE_FILE,
                path.display()
            );
        }

        let content = fs::read_to_string(&scene_path)
            .with_context(|| format!("Failed to read {}", scene_path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", scene_path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Every problem in the scene; empty means it will run
    pub fn check(&self) -> Vec<SceneError> {
        let mut seen = HashSet::new();
        let mut problems = Vec::new();
        for value in &self.values {
            if !seen.insert(value.name.as_str()) {
                problems.push(SceneError::DuplicateName(value.name.clone()));
            }
            if let Err(e) = value.descriptor() {
                problems.push(e);
            }
            if let Err(e) = value.interpolator() {
                problems.push(e);
            }
        }
        problems
    }

    /// Sample scene written by `glint init`
    pub fn sample(name: &str) -> Self {
        Self {
            scene: SceneMeta {
                name: name.to_string(),
                description: Some("Floating icon, shimmering button and a progress bar".to_string()),
            },
            run: RunConfig::default(),
            values: vec![
                ValueConfig {
                    name: "icon_offset".to_string(),
                    initial: 0.0,
                    preset: Some(PresetSpec::Float {
                        amplitude: -8.0,
                        period_ms: 1200,
                    }),
                    animation: None,
                    map: None,
                },
                ValueConfig {
                    name: "shimmer".to_string(),
                    initial: 0.0,
                    preset: Some(PresetSpec::Shimmer {
                        sweep_ms: 900,
                        pause_ms: 600,
                    }),
                    animation: None,
                    map: None,
                },
                ValueConfig {
                    name: "progress".to_string(),
                    initial: 0.0,
                    preset: None,
                    animation: Some(AnimationDescriptor::timing(
                        0.6,
                        800,
                        glint_animation::Easing::EaseInOut,
                    )),
                    map: Some(MapConfig {
                        input: vec![0.0, 1.0],
                        output: vec![0.0, 320.0],
                    }),
                },
            ],
        }
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_animation::Easing;

    const SCENE: &str = r#"
[scene]
name = "home"

[run]
frames = 60
tick_ms = 16

[[value]]
name = "icon_offset"
preset = { kind = "float", amplitude = 8.0, period_ms = 1200 }

[[value]]
name = "progress"
initial = 0.1
animation = { timing = { target = 0.6, duration_ms = 800, easing = "ease_in_out" } }
map = { input = [0.0, 1.0], output = [0.0, 320.0] }
"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneConfig::from_toml(SCENE).unwrap();
        assert_eq!(scene.scene.name, "home");
        assert_eq!(scene.run.frames, 60);
        assert_eq!(scene.run.tick_ms, 16.0);
        assert_eq!(scene.run.sample_every, 10);
        assert_eq!(scene.values.len(), 2);

        let progress = &scene.values[1];
        assert_eq!(progress.initial, 0.1);
        assert_eq!(
            progress.descriptor().unwrap(),
            AnimationDescriptor::timing(0.6, 800, Easing::EaseInOut)
        );
        assert_eq!(progress.interpolator().unwrap().unwrap().at(0.5), 160.0);
        assert!(scene.check().is_empty());
    }

    #[test]
    fn test_nested_descriptor() {
        let scene = SceneConfig::from_toml(
            r#"
[scene]
name = "nested"

[[value]]
name = "ring"
animation = { repeat = { count = -1, reverse = true, inner = { sequence = { steps = [
    { timing = { target = 1.2, duration_ms = 300 } },
    { delay = { ms = 100, inner = { timing = { target = 1.0, duration_ms = 300 } } } },
] } } } }
"#,
        )
        .unwrap();
        let desc = scene.values[0].descriptor().unwrap();
        assert_eq!(desc.duration_ms(), None);
        assert_eq!(desc.node_count(), 5);
    }

    #[test]
    fn test_easing_names_as_listed() {
        // `glint presets` prints kebab-case; scene files accept it as well
        for easing in Easing::named() {
            let scene = SceneConfig::from_toml(&format!(
                r#"
[scene]
name = "easing"

[[value]]
name = "x"
animation = {{ timing = {{ target = 1.0, duration_ms = 100, easing = "{easing}" }} }}
"#
            ))
            .unwrap();
            assert_eq!(
                scene.values[0].descriptor().unwrap(),
                AnimationDescriptor::timing(1.0, 100, *easing)
            );
        }

        let scene = SceneConfig::from_toml(
            r#"
[scene]
name = "easing"

[[value]]
name = "snake"
animation = { timing = { target = 1.0, duration_ms = 100, easing = "ease_out_cubic" } }

[[value]]
name = "bezier"
animation = { timing = { target = 1.0, duration_ms = 100, easing = { cubic_bezier = [0.25, 0.1, 0.25, 1.0] } } }
"#,
        )
        .unwrap();
        assert_eq!(
            scene.values[0].descriptor().unwrap(),
            AnimationDescriptor::timing(1.0, 100, Easing::EaseOutCubic)
        );
        assert_eq!(
            scene.values[1].descriptor().unwrap(),
            AnimationDescriptor::timing(1.0, 100, Easing::CubicBezier(0.25, 0.1, 0.25, 1.0))
        );
    }

    #[test]
    fn test_check_reports_every_problem() {
        let scene = SceneConfig::from_toml(
            r#"
[scene]
name = "broken"

[[value]]
name = "a"
animation = { timing = { target = 1.0, duration_ms = 0 } }

[[value]]
name = "a"
preset = { kind = "fade_in", duration_ms = 100 }
map = { input = [1.0, 0.0], output = [0.0, 1.0] }

[[value]]
name = "b"
"#,
        )
        .unwrap();
        let problems: Vec<String> = scene.check().iter().map(ToString::to_string).collect();
        assert_eq!(
            problems,
            [
                "value 'a': timing duration must be greater than zero",
                "value 'a' is declared more than once",
                "value 'a' map: input range must be finite and strictly increasing (breakpoint 1)",
                "value 'b' needs either `preset` or `animation`",
            ]
        );
    }

    #[test]
    fn test_sample_round_trips_through_toml() {
        let sample = SceneConfig::sample("demo");
        let parsed = SceneConfig::from_toml(&sample.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.scene.name, "demo");
        assert_eq!(parsed.values.len(), 3);
        assert!(parsed.check().is_empty());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = SceneConfig::load_from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("glint init"));

        fs::write(dir.path().join(SCENE_FILE), SCENE).unwrap();
        let scene = SceneConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(scene.scene.name, "home");

        let file = dir.path().join("other.toml");
        fs::write(&file, "[scene]\nname = 3\n").unwrap();
        let err = SceneConfig::load_from_dir(&file).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
    }
}
