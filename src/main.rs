mod viewer;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use knowledge_universe::engine::Dimensions;
use knowledge_universe::{DisplayMode, EngineConfig};

const DEFAULT_LOG_FILTER: &str = "knowledge_universe=info";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Dataset JSON with `nodes` and `relations`.
    #[arg(long)]
    dataset: PathBuf,

    /// Engine config JSON. Omitted sections keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Edge source: explicit, inferred or both.
    #[arg(long)]
    mode: Option<DisplayMode>,

    #[arg(long)]
    seed: Option<u64>,

    /// Lay the graph out on a plane.
    #[arg(long)]
    two_d: bool,

    /// Directory holding node skin images named `<skin>.png`.
    #[arg(long)]
    skins: Option<PathBuf>,

    /// Log filter, for example `knowledge_universe=debug`.
    #[arg(long)]
    log: Option<String>,
}

fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(filter) => EnvFilter::try_new(filter).context("invalid --log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid engine config in {}", path.display()))?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        config.display_mode = mode;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.two_d {
        config.physics.dimensions = Dimensions::Two;
    }
    info!(
        dataset = %args.dataset.display(),
        mode = %config.display_mode,
        seed = config.seed,
        "starting viewer"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let dataset = args.dataset;
    let skins = args.skins;
    eframe::run_native(
        "Knowledge Universe",
        options,
        Box::new(move |cc| {
            Ok(Box::new(viewer::UniverseApp::new(
                cc, dataset, config, skins,
            )))
        }),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}
