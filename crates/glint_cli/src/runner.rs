//! Deterministic headless scene runs
//!
//! Drives every value in a scene through a private frame driver with a fixed
//! delta and records sampled values. No wall clock is involved, so the same
//! scene always produces the same report.

use crate::config::{RunConfig, SceneConfig};
use anyhow::{bail, Context, Result};
use glint_animation::{DriverConfig, FrameDriver, Interpolator, SharedValue, TimelineId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use tracing::{debug, info};

/// Values at one sampled frame, in scene order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub frame: u32,
    pub time_ms: f64,
    pub values: Vec<f32>,
}

/// Frame on which a value's animation completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub value: String,
    pub frame: u32,
}

/// Machine-readable result of a scene run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneReport {
    pub scene: String,
    pub frames: u32,
    pub tick_ms: f64,
    pub columns: Vec<String>,
    pub samples: Vec<Sample>,
    pub completions: Vec<Completion>,
    /// Values still animating after the last frame
    pub still_running: Vec<String>,
}

struct BoundValue {
    name: String,
    value: SharedValue<f32>,
    map: Option<Interpolator<f32>>,
}

impl BoundValue {
    fn read(&self) -> f32 {
        match &self.map {
            Some(map) => self.value.interpolate(map),
            None => self.value.on_frame(),
        }
    }
}

/// Run `scene` with the given frame budget
pub fn run_scene(scene: &SceneConfig, run: &RunConfig) -> Result<SceneReport> {
    if run.frames == 0 {
        bail!("frames must be > 0");
    }
    if !(run.tick_ms.is_finite() && run.tick_ms > 0.0) {
        bail!("tick_ms must be a positive number, got {}", run.tick_ms);
    }
    if let Some(problem) = scene.check().into_iter().next() {
        return Err(problem).context("Scene failed validation (run `glint check` for details)");
    }

    let driver = FrameDriver::new(DriverConfig {
        max_dt_ms: run.max_dt_ms,
        ..DriverConfig::default()
    });

    let mut bound = Vec::with_capacity(scene.values.len());
    let mut owners: HashMap<TimelineId, usize> = HashMap::new();
    for config in &scene.values {
        let value = driver.shared_value(config.initial);
        let id = value
            .attach(config.descriptor()?)
            .with_context(|| format!("Failed to attach animation to '{}'", config.name))?;
        owners.insert(id, bound.len());
        bound.push(BoundValue {
            name: config.name.clone(),
            value,
            map: config.interpolator()?,
        });
    }

    info!(
        "Running scene {} ({} values, {} frames at {}ms)",
        scene.scene.name,
        bound.len(),
        run.frames,
        run.tick_ms
    );

    let sample_every = run.sample_every.max(1);
    let snapshot = |frame: u32| Sample {
        frame,
        time_ms: frame as f64 * run.tick_ms,
        values: bound.iter().map(BoundValue::read).collect(),
    };

    let mut samples = vec![snapshot(0)];
    let mut completions = Vec::new();
    for frame in 1..=run.frames {
        let stats = driver.tick_ms(run.tick_ms);
        for id in &stats.completed {
            if let Some(&index) = owners.get(id) {
                debug!(value = %bound[index].name, frame, "animation completed");
                completions.push(Completion {
                    value: bound[index].name.clone(),
                    frame,
                });
            }
        }
        if frame % sample_every == 0 || frame == run.frames {
            samples.push(snapshot(frame));
        }
    }

    let still_running = bound
        .iter()
        .filter(|b| b.value.is_animating())
        .map(|b| b.name.clone())
        .collect();
    driver.shutdown();

    Ok(SceneReport {
        scene: scene.scene.name.clone(),
        frames: run.frames,
        tick_ms: run.tick_ms,
        columns: bound.into_iter().map(|b| b.name).collect(),
        samples,
        completions,
        still_running,
    })
}

impl SceneReport {
    pub fn write_json<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)?;
        writer.write_all(payload.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        let widths: Vec<usize> = self.columns.iter().map(|c| c.len().max(10)).collect();

        write!(writer, "{:>6} {:>10}", "frame", "time_ms")?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(writer, " {column:>width$}")?;
        }
        writeln!(writer)?;

        for sample in &self.samples {
            write!(writer, "{:>6} {:>10.1}", sample.frame, sample.time_ms)?;
            for (value, width) in sample.values.iter().zip(&widths) {
                write!(writer, " {value:>width$.3}")?;
            }
            writeln!(writer)?;
        }

        if !self.completions.is_empty() {
            writeln!(writer)?;
            for completion in &self.completions {
                writeln!(
                    writer,
                    "{} completed at frame {}",
                    completion.value, completion.frame
                )?;
            }
        }
        if !self.still_running.is_empty() {
            writeln!(writer, "still running: {}", self.still_running.join(", "))?;
        }
        Ok(())
    }
}
