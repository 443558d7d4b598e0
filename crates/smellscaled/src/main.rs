//! smellscaled — the Smell Scale daemon.
//!
//! Single binary that assembles:
//! - State store (redb or flat JSON file)
//! - Daily base-adjustment scheduler
//! - REST API
//!
//! # Usage
//!
//! ```text
//! smellscaled --port 4000 --data-dir /var/lib/smellscale
//! smellscaled status --data-dir /var/lib/smellscale
//! smellscaled config > smellscale.toml
//! ```

mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use smellscale_core::{ScaleConfig, ScaleReport};
use smellscale_state::{JsonFileStore, RedbStore, ScaleStore};

/// Config file picked up from the data directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "smellscale.toml";

#[derive(Parser)]
#[command(name = "smellscaled", about = "Smell Scale daemon")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and run the daily schedule (default).
    Serve(ServeArgs),

    /// Print the current scale from the store and exit.
    Status {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print the effective configuration as TOML.
    Config {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Directory holding the state store and the default config file.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Persistence backend.
    #[arg(long, value_enum, default_value = "redb")]
    backend: Backend,

    /// Config file (defaults to `<data-dir>/smellscale.toml` if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the vote half-life from the config file.
    #[arg(long)]
    half_life_hours: Option<f64>,
}

#[derive(Args, Clone)]
struct ServeArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "4000")]
    port: u16,

    /// Upper bound, in seconds, on how long the scheduler sleeps between checks.
    #[arg(long, default_value = "60")]
    schedule_poll: u64,

    /// Do not run the daily schedule.
    #[arg(long)]
    no_schedule: bool,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Embedded redb database (`smellscale.redb`).
    Redb,
    /// Flat JSON file (`scaleData.json`).
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => {
            let config = load_config(&args.store)?;
            let store = open_store(&args.store)?;
            serve::run(args.port, store, config, args.schedule_poll, !args.no_schedule).await
        }
        Command::Status { store: args } => {
            let config = load_config(&args)?;
            let store = open_store(&args)?;
            let report = ScaleReport::compute(&store.load(), config.half_life_hours, chrono::Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Config { store: args } => {
            let config = load_config(&args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Human-readable logs by default; `SMELLSCALE_LOG_FORMAT=json` switches to
/// one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,smellscaled=debug,smellscale=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("SMELLSCALE_LOG_FORMAT").is_ok_and(|v| v == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolve the effective configuration: explicit file, else the data-dir
/// default if it exists, else built-in defaults; CLI overrides last.
fn load_config(args: &StoreArgs) -> anyhow::Result<ScaleConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| Some(args.data_dir.join(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()));

    let mut config = match &path {
        Some(path) => ScaleConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ScaleConfig::default(),
    };

    if let Some(half_life) = args.half_life_hours {
        config.half_life_hours = half_life;
    }
    config.validate()?;

    info!(
        path = ?path,
        half_life_hours = config.half_life_hours,
        schedule_entries = config.schedule.len(),
        "configuration loaded"
    );
    Ok(config)
}

fn open_store(args: &StoreArgs) -> anyhow::Result<ScaleStore> {
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data dir {}", args.data_dir.display()))?;
    let store = match args.backend {
        Backend::Redb => ScaleStore::new(Arc::new(RedbStore::open(&redb_path(&args.data_dir))?)),
        Backend::Json => ScaleStore::new(Arc::new(JsonFileStore::in_dir(&args.data_dir))),
    };
    info!(backend = %store.backend().describe(), "state store opened");
    Ok(store)
}

fn redb_path(data_dir: &Path) -> PathBuf {
    data_dir.join("smellscale.redb")
}
