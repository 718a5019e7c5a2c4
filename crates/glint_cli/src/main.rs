//! Glint CLI
//!
//! Run and check animation scenes headlessly.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod runner;

use config::{SceneConfig, SCENE_FILE};
use glint_animation::{AnimationPreset, Easing};

#[derive(Parser)]
#[command(name = "glint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Glint animation engine CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a scene for a number of frames and print sampled values
    Run {
        /// Scene file or directory containing glint.toml
        #[arg(default_value = ".")]
        scene: String,

        /// Override the frame count
        #[arg(short, long)]
        frames: Option<u32>,

        /// Override the fixed frame delta in milliseconds
        #[arg(short, long)]
        tick_ms: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Validate every animation in a scene
    Check {
        /// Scene file or directory containing glint.toml
        #[arg(default_value = ".")]
        scene: String,
    },

    /// List animation presets and easing curves
    Presets,

    /// Write a sample glint.toml
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scene,
            frames,
            tick_ms,
            format,
        } => cmd_run(&scene, frames, tick_ms, format),

        Commands::Check { scene } => cmd_check(&scene),

        Commands::Presets => cmd_presets(),

        Commands::Init { dir } => cmd_init(&dir),
    }
}

fn cmd_run(
    source: &str,
    frames: Option<u32>,
    tick_ms: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let scene = SceneConfig::load_from_dir(&PathBuf::from(source))?;

    let mut run = scene.run.clone();
    if let Some(frames) = frames {
        run.frames = frames;
    }
    if let Some(tick_ms) = tick_ms {
        run.tick_ms = tick_ms;
    }

    let report = runner::run_scene(&scene, &run)?;
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Table => report.write_table(&mut stdout),
        OutputFormat::Json => report.write_json(&mut stdout),
    }
}

fn cmd_check(source: &str) -> Result<()> {
    let scene = SceneConfig::load_from_dir(&PathBuf::from(source))?;

    info!("Checking scene: {}", scene.scene.name);

    let problems = scene.check();
    if problems.is_empty() {
        info!("{} values OK", scene.values.len());
        return Ok(());
    }

    for problem in &problems {
        error!("{problem}");
    }
    anyhow::bail!("{} problem(s) found in {}", problems.len(), scene.scene.name)
}

fn cmd_presets() -> Result<()> {
    println!("Presets:");
    for name in AnimationPreset::names() {
        let spec = AnimationPreset::from_name(name)?;
        let duration = match spec.descriptor().duration_ms() {
            Some(ms) => format!("{ms}ms"),
            None => "forever".to_string(),
        };
        let params = spec.to_string();
        println!("  {name:<10} {params:<60} {duration}");
    }
    println!();
    println!("Easing curves:");
    for easing in Easing::named() {
        println!("  {easing}");
    }
    println!("  cubic-bezier(x1, y1, x2, y2)");
    Ok(())
}

fn cmd_init(dir: &str) -> Result<()> {
    let path = PathBuf::from(dir);
    let scene_path = path.join(SCENE_FILE);
    if scene_path.exists() {
        anyhow::bail!("{} already exists", scene_path.display());
    }

    let cwd = std::env::current_dir()?;
    let name = fs::canonicalize(&path)
        .unwrap_or_else(|_| cwd.join(&path))
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("glint_scene")
        .to_string();

    fs::create_dir_all(&path)?;
    fs::write(&scene_path, SceneConfig::sample(&name).to_toml()?)?;

    info!("Scene written to {}", scene_path.display());
    info!("Run `glint run {}` to drive it", dir);
    Ok(())
}
