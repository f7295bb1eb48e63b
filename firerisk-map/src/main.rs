//! Point d'entrée CLI pour firerisk-map

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use firerisk_map::Config;

// Charger .env au démarrage (clé FIRMS_MAP_KEY)
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Cartes de risque d'incendie de forêt (Roumanie)
#[derive(Parser)]
#[command(name = "firerisk-map")]
#[command(author, version)]
#[command(about = "Entraîner, annoter et exporter les cartes de risque d'incendie (GeoJSON)")]
struct Cli {
    /// Fichier de configuration JSON (défaut : preset)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Preset embarqué utilisé sans --config
    #[arg(long, default_value = "romania", global = true)]
    preset: String,

    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mut config = Config::resolve(cli.config.as_deref(), &cli.preset)?.with_env();

    match cli.command {
        Commands::Train { paths } => {
            paths.apply(&mut config);
            info!(table = %config.paths.training_table.display(), "Training");
            cli::cmd_train(&config)?;
        }
        Commands::Score { paths, ratio } => {
            paths.apply(&mut config);
            if let Some(ratio) = ratio {
                config.sampling.ratio = ratio;
            }
            info!(output = %config.paths.output_dir.display(), "Scoring grid");
            cli::cmd_score(&config)?;
        }
        Commands::Zones { paths, simplify } => {
            paths.apply(&mut config);
            if let Some(simplify) = simplify {
                config.zones.simplify_meters = simplify;
            }
            info!(output = %config.paths.output_dir.display(), "Building zones");
            cli::cmd_zones(&config)?;
        }
        Commands::Evaluate {
            paths,
            days,
            buffer,
        } => {
            paths.apply(&mut config);
            if let Some(days) = days {
                config.feed.lookback_days = days;
            }
            if let Some(buffer) = buffer {
                config.evaluation.buffer_meters = buffer;
            }
            info!(days = config.feed.lookback_days, "Evaluating against hotspots");
            cli::cmd_evaluate(&config).await?;
        }
        Commands::Rebuild { paths } => {
            paths.apply(&mut config);
            cli::cmd_rebuild(&config).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
