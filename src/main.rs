//! Binary entrypoint for spot-light.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use spotlight::config::Configuration;
use spotlight::render::viewer;
use spotlight::source;
use spotlight::state::EditState;

/// Simple CLI
#[derive(Debug, Parser)]
#[command(
    name = "spot-light",
    about = "Spotlight a single color channel of a random photo"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the picture directory
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Preferred image file name inside the picture directory
    #[arg(long, value_name = "FILE_NAME")]
    name: Option<String>,

    /// Override the working width (px)
    #[arg(long, value_name = "PX")]
    width: Option<u32>,

    /// Seed for the random image pick
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("spotlight={level}").parse()?)
        .add_directive(format!("spot_light={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Configuration> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let cfg = Configuration::from_yaml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            info!(path = %path.display(), "configuration loaded");
            cfg
        }
        None => Configuration::default(),
    };
    if let Some(dir) = &cli.dir {
        cfg.picture_dir = Some(dir.clone());
    }
    if let Some(name) = &cli.name {
        cfg.image_name = Some(name.clone());
    }
    if let Some(width) = cli.width {
        cfg.working_width = width;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = Some(seed);
    }
    cfg.validated().context("validating configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = load_config(&cli)?;
    let dir = cfg.resolve_picture_dir()?;

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let path = source::resolve(cfg.image_name.as_deref(), &dir, &mut rng)
        .with_context(|| format!("selecting an image from {}", dir.display()))?;
    info!(path = %path.display(), "selected image");

    let image = source::load(&path, cfg.working_width)?;
    let state = EditState::from_config(&cfg);

    viewer::run(&cfg, image, state)?;
    info!("Bye bye");
    Ok(())
}
