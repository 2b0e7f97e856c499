use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use keepsake_core::{AppConfig, AssetClassifier, AssetPool, FeedComposer, KeepsakeError};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

mod replay;

fn main() -> keepsake_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Compose { source } => run_compose(&config, &source),
        Commands::Replay {
            source,
            script,
            block_autoplay,
        } => run_replay(&config, &source, &script, block_autoplay),
    }
}

fn run_compose(config: &AppConfig, source: &PoolSource) -> keepsake_core::Result<()> {
    let pool = source.load()?;
    tracing::info!(assets = pool.len(), "composing feed");

    let classifier = AssetClassifier::from_config(&config.feed);
    let feed = FeedComposer::from_config(&config.feed).compose_pool(&classifier, &pool);
    println!("{}", serde_json::to_string_pretty(&feed)?);
    Ok(())
}

fn run_replay(
    config: &AppConfig,
    source: &PoolSource,
    script: &Path,
    block_autoplay: bool,
) -> keepsake_core::Result<()> {
    let pool = source.load()?;
    let steps = replay::load_script(script)?;
    tracing::info!(?script, steps = steps.len(), "replaying session");

    let report = replay::run(config, &pool, steps, block_autoplay);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Asset manifest: either an ordered list of `[locator, reference]` pairs or
/// an object keyed by locator (read in key order).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Manifest {
    Pairs(Vec<(String, String)>),
    Map(BTreeMap<String, String>),
}

impl Manifest {
    fn into_pool(self) -> AssetPool {
        match self {
            Self::Pairs(pairs) => AssetPool::from_pairs(pairs),
            Self::Map(map) => AssetPool::from_pairs(map),
        }
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct PoolSource {
    /// JSON manifest mapping asset locators to references.
    #[arg(short, long)]
    manifest: Option<PathBuf>,
    /// Directory to scan for media files (sorted by name).
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

impl PoolSource {
    fn load(&self) -> keepsake_core::Result<AssetPool> {
        match (&self.manifest, &self.dir) {
            (Some(manifest), _) => {
                let raw = std::fs::read_to_string(manifest)?;
                let manifest: Manifest = serde_json::from_str(&raw)?;
                Ok(manifest.into_pool())
            }
            (None, Some(dir)) => scan_dir(dir),
            (None, None) => Err(KeepsakeError::msg("no asset source given")),
        }
    }
}

fn scan_dir(dir: &Path) -> keepsake_core::Result<AssetPool> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut pool = AssetPool::new();
    for path in files {
        let locator = path.to_string_lossy().into_owned();
        let reference = format!("file://{locator}");
        pool.push(locator, reference);
    }
    Ok(pool)
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Media feed composer and playback coordinator", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify an asset pool and print the composed feed as JSON.
    Compose {
        #[command(flatten)]
        source: PoolSource,
    },
    /// Replay a scripted session and print the final playback state.
    Replay {
        #[command(flatten)]
        source: PoolSource,
        /// JSON list of session steps.
        script: PathBuf,
        /// Reject the first background audio play, as browsers do before a
        /// user gesture.
        #[arg(long)]
        block_autoplay: bool,
    },
}
