#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted village on the navigation grid.

mod village;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gridwalk_core::NavigationConfig;
use gridwalk_system_agents::ExecutionMode;
use tracing_subscriber::EnvFilter;

use crate::village::{Village, VillageOptions};

/// Runs villagers gathering, hauling and repairing on a grid.
#[derive(Debug, Parser)]
#[command(name = "gridwalk", version, long_about = None)]
struct Cli {
    /// Navigation config in TOML; every field falls back to its default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed updates to simulate.
    #[arg(long, default_value_t = 1_200)]
    updates: u64,

    /// Overrides the grid size of the config.
    #[arg(long)]
    grid_size: Option<u32>,

    /// Villagers to spawn around the depot.
    #[arg(long, default_value_t = 6)]
    villagers: u32,

    /// Seed for the layout and the agents' repath jitter.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Where path searches run.
    #[arg(long, value_enum, default_value_t = Mode::Cooperative)]
    mode: Mode,

    /// Tracing filter directives; `RUST_LOG` is used when omitted.
    #[arg(long)]
    log_filter: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Searches run inline after every fixed update.
    Cooperative,
    /// Searches run on a dedicated worker.
    Threaded,
}

impl From<Mode> for ExecutionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Cooperative => ExecutionMode::Cooperative,
            Mode::Threaded => ExecutionMode::Threaded,
        }
    }
}

/// Entry point for the gridwalk command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref())?;

    let config = load_config(&cli)?;
    let options = VillageOptions {
        villagers: cli.villagers,
        updates: cli.updates,
        seed: cli.seed,
        mode: cli.mode.into(),
    };
    let village = Village::build(config, &options)?;
    let summary = village.run(options.updates).await?;
    println!("{summary}");
    Ok(())
}

fn init_logging(directives: Option<&str>) -> Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives).context("invalid --log-filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<NavigationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            NavigationConfig::from_toml_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => NavigationConfig::default(),
    };
    if let Some(size) = cli.grid_size {
        config.grid.size = size;
    }
    config.validate().context("validating the navigation config")?;
    Ok(config)
}
