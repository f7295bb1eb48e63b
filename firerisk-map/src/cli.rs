//! Définition et implémentation des commandes CLI
//!
//! - `train` : table historique → artefacts de modèle
//! - `score` : modèle + frontière → grilles annotée et échantillonnée
//! - `zones` : modèle + frontière → zones de risque
//! - `evaluate` : grille annotée confrontée aux hotspots récents
//! - `rebuild` : tout, dans l'ordre

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use firerisk_map::config::Config;
use firerisk_map::pipeline;
use firerisk_map::report::RunReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Train both forests from the historical table and save the artifacts
    Train {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// Score the country grid and write full and sampled GeoJSON grids
    Score {
        #[command(flatten)]
        paths: PathArgs,

        /// Sampling ratio override, in (0, 1]
        #[arg(long)]
        ratio: Option<f64>,
    },

    /// Build merged hexagon risk zones
    Zones {
        #[command(flatten)]
        paths: PathArgs,

        /// Simplification tolerance in ground meters (0 = none)
        #[arg(long)]
        simplify: Option<f64>,
    },

    /// Compare the scored grid with recent FIRMS hotspots
    Evaluate {
        #[command(flatten)]
        paths: PathArgs,

        /// Look-back window in days
        #[arg(long)]
        days: Option<u32>,

        /// Buffer radius around each hotspot (meters)
        #[arg(long)]
        buffer: Option<f64>,
    },

    /// Train, score, sample, build zones and evaluate in one run
    Rebuild {
        #[command(flatten)]
        paths: PathArgs,
    },
}

/// Surcharges des chemins de la configuration
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Country boundaries (GeoJSON FeatureCollection)
    #[arg(long)]
    pub boundary: Option<PathBuf>,

    /// Historical training table (CSV)
    #[arg(long)]
    pub training_table: Option<PathBuf>,

    /// Model artifact directory
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Output directory for GeoJSON files and the report
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl PathArgs {
    pub fn apply(self, config: &mut Config) {
        if let Some(p) = self.boundary {
            config.paths.boundary = p;
        }
        if let Some(p) = self.training_table {
            config.paths.training_table = p;
        }
        if let Some(p) = self.model_dir {
            config.paths.model_dir = p;
        }
        if let Some(p) = self.output {
            config.paths.output_dir = p;
        }
    }
}

/// Exécute la commande train
pub fn cmd_train(config: &Config) -> Result<()> {
    let start = Instant::now();
    let mut report = RunReport::new(&config.region.name);

    pipeline::train(config, &mut report)?;

    if let Some(ref t) = report.training {
        info!(
            rows = t.rows_used,
            folds = t.folds,
            oof_accuracy = t.oof_vegetation_accuracy,
            model_dir = %config.paths.model_dir.display(),
            "Training complete"
        );
    }

    report.set_duration(start.elapsed());
    report.finalize();
    report.display();
    Ok(())
}

/// Exécute la commande score
pub fn cmd_score(config: &Config) -> Result<()> {
    let start = Instant::now();
    let mut report = RunReport::new(&config.region.name);

    let model = pipeline::load_model(config)?;
    let boundary = pipeline::load_boundary(config)?;
    let scored = pipeline::score_grid(config, &boundary, &model)?;

    report.record_scored(&scored);
    let path = config.paths.output_dir.join(pipeline::SCORED_GRID_FILE);
    firerisk_map::export::write_scored_grid(&scored, &path)?;
    report.record_output(&path);

    let sampled = firerisk::sampler::sample(
        &scored,
        config.sampling.ratio,
        &config.sampling.weights,
        config.sampling.seed,
    )?;
    report.sampled_points = sampled.len();
    let path = config.paths.output_dir.join(pipeline::SAMPLED_GRID_FILE);
    firerisk_map::export::write_scored_grid(&sampled, &path)?;
    report.record_output(&path);

    report.set_duration(start.elapsed());
    report.finalize();
    report.display();
    Ok(())
}

/// Exécute la commande zones
pub fn cmd_zones(config: &Config) -> Result<()> {
    let start = Instant::now();
    let mut report = RunReport::new(&config.region.name);

    let model = pipeline::load_model(config)?;
    let boundary = pipeline::load_boundary(config)?;
    let scored = pipeline::score_grid(config, &boundary, &model)?;
    report.record_scored(&scored);

    let path = pipeline::write_zones(config, &scored, &mut report)?;
    info!(output = %path.display(), "Zones written");

    report.set_duration(start.elapsed());
    report.finalize();
    report.display();
    Ok(())
}

/// Exécute la commande evaluate
pub async fn cmd_evaluate(config: &Config) -> Result<()> {
    let start = Instant::now();
    let mut report = RunReport::new(&config.region.name);

    let model = pipeline::load_model(config)?;
    let boundary = pipeline::load_boundary(config)?;
    let scored = pipeline::score_grid(config, &boundary, &model)?;
    report.record_scored(&scored);

    pipeline::evaluate_live(config, &boundary, &scored, &mut report).await?;

    report.set_duration(start.elapsed());
    report.finalize();
    report.display();
    Ok(())
}

/// Exécute la commande rebuild
pub async fn cmd_rebuild(config: &Config) -> Result<()> {
    let report = pipeline::rebuild(config).await?;
    report.display();
    Ok(())
}
