use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use worldsim::{
    bridge::SimHandle,
    config::{ConfigLoader, SimConfig},
    model::{StepOutcome, WorldModel},
    snapshot::SnapshotWriter,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "WorldSim region simulation server")]
struct Cli {
    /// Path to a YAML configuration file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Seed every random stream for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long)]
    tick_interval_ms: Option<u64>,

    /// Start ticking as soon as the server is up
    #[arg(long)]
    autostart: bool,

    /// Run without a server for a fixed number of ticks
    #[arg(long)]
    headless: bool,

    /// Tick count for headless runs
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// Directory for headless snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Snapshot interval in ticks (0 disables snapshot files)
    #[arg(long, default_value_t = 0)]
    snapshot_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::new(".").load(path)?,
        None => SimConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(ms) = cli.tick_interval_ms {
        config.runtime.tick_interval_ms = ms;
    }
    config.validate()?;

    if cli.headless {
        return run_headless(config, &cli);
    }

    let handle = SimHandle::new(WorldModel::new(config));
    web::run(
        handle,
        WebServerConfig {
            host: cli.host.clone(),
            port: cli.port,
            autostart: cli.autostart,
        },
    )
    .await
}

fn run_headless(config: SimConfig, cli: &Cli) -> Result<()> {
    let snapshot_dir = cli
        .snapshot_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("snapshots"));
    let writer = SnapshotWriter::new(snapshot_dir, cli.snapshot_interval);
    let mut model = WorldModel::new(config);
    model.start()?;

    for _ in 0..cli.ticks {
        let outcome = model.step();
        if let Some(path) = writer.maybe_write(&model.snapshot())? {
            info!(path = %path.display(), "snapshot written");
        }
        if let StepOutcome::Ended { tick } = outcome {
            info!(tick, "collapse threshold reached");
            break;
        }
    }

    let snapshot = model.snapshot();
    info!(
        tick = snapshot.tick,
        population = snapshot.total_population,
        alive_regions = snapshot.alive_regions,
        total_regions = snapshot.total_regions,
        "headless run complete"
    );
    Ok(())
}
