use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scout_engine::config::AppConfig;
use scout_engine::models::{RejectedKind, Season};
use scout_engine::pipeline::{self, RunInput, RunOutput};
use scout_engine::storage::benchmark_store::BenchmarkStore;
use scout_engine::storage::StorageConfig;

#[derive(Parser)]
#[command(name = "scout-engine")]
#[command(about = "Basketball box-score derivation, lineup reconstruction and benchmarking")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive metrics, lineups, zones and ranks for a season
    Derive {
        #[arg(long)]
        season: Season,

        /// Compute everything but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Skip the Parquet mirrors
        #[arg(long)]
        no_parquet: bool,
    },

    /// Rebuild and publish benchmark distributions for a season
    BuildBenchmarks {
        #[arg(long)]
        season: Season,
    },

    /// Show the published benchmark snapshot, or an archived version
    Benchmarks {
        /// Only show this season
        #[arg(long)]
        season: Option<Season>,

        /// Show an archived snapshot instead of the current one
        #[arg(long = "snapshot-version")]
        version: Option<u64>,
    },

    /// Check a season's input without deriving anything
    Validate {
        #[arg(long)]
        season: Season,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_summary(out: &RunOutput) {
    let count = |kind: RejectedKind| out.rejections.iter().filter(|r| r.kind == kind).count();
    println!("Season {}", out.season);
    println!("  team-games:    {}", out.team_games.len());
    println!("  player-games:  {}", out.player_games.len());
    println!("  stints:        {}", out.stints.len());
    println!("  zone rows:     {}", out.zones.len());
    println!("  play context:  {}", out.play_context.len());
    println!("  on/off splits: {}", out.on_off.len());
    println!(
        "  rejections:    {} (team {}, player {}, play-by-play {})",
        out.rejections.len(),
        count(RejectedKind::TeamGame),
        count(RejectedKind::PlayerGame),
        count(RejectedKind::PlayByPlay)
    );
    println!(
        "  benchmarks:    v{}{}",
        out.snapshot.version(),
        if out.rebuilt { "" } else { " (rebuild failed, prior kept)" }
    );
}

fn derive(
    config: &AppConfig,
    storage: &StorageConfig,
    season: Season,
    write_outputs: bool,
    parquet: bool,
    publish: bool,
) -> Result<RunOutput> {
    let store = BenchmarkStore::new(storage.clone());
    let prior = store
        .load_current()
        .context("Failed to load published benchmarks")?;
    let input = RunInput::load(storage, season)
        .with_context(|| format!("Failed to read input for season {}", season))?;

    let out = pipeline::run(input, &prior, config)?;
    out.commit(storage, publish, write_outputs, parquet)
        .context("Failed to publish benchmarks or write derived outputs")?;
    Ok(out)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting scout-engine v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::Derive {
            season,
            dry_run,
            no_parquet,
        } => {
            let out = derive(&config, &storage, season, !dry_run, !no_parquet, !dry_run)?;
            print_summary(&out);
            if dry_run {
                println!("Dry run: nothing written");
            }
        }

        Commands::BuildBenchmarks { season } => {
            let out = derive(&config, &storage, season, false, false, true)?;
            if !out.rebuilt {
                anyhow::bail!("Benchmark rebuild failed for season {}", season);
            }
            let count = out.snapshot.for_season(season).count();
            println!(
                "Published benchmarks v{} ({} distributions for season {})",
                out.snapshot.version(),
                count,
                season
            );
        }

        Commands::Benchmarks { season, version } => {
            let store = BenchmarkStore::new(storage.clone());
            let snapshot = match version {
                Some(v) => store
                    .load_version(v)
                    .with_context(|| format!("No archived benchmarks v{}", v))?,
                None => store.load_current()?,
            };
            let built = snapshot
                .built_at()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!("Benchmarks v{} (built {})", snapshot.version(), built);
            println!("Seasons: {:?}", snapshot.seasons());
            let archived = store.history()?;
            if !archived.is_empty() {
                println!("Archived versions: {:?}", archived);
            }

            for dist in snapshot
                .iter()
                .filter(|d| season.map_or(true, |s| d.key.season == s))
            {
                println!(
                    "  {:<32} n={:<5} p10={:<10.4} p50={:<10.4} p90={:<10.4}",
                    dist.key.to_string(),
                    dist.n,
                    dist.p10,
                    dist.p50,
                    dist.p90
                );
            }
        }

        Commands::Validate { season } => {
            let input = RunInput::load(&storage, season)?;
            let rejections = pipeline::check(&input);
            println!(
                "Season {}: {} team rows, {} player rows, {} events",
                season,
                input.team_games.len(),
                input.player_games.len(),
                input.events.len()
            );
            if rejections.is_empty() {
                println!("No problems found");
            }
            for r in &rejections {
                println!("  {:?} {}: {}", r.kind, r.record, r.reason);
            }
        }
    }

    Ok(())
}
