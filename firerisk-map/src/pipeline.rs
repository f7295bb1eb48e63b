//! Étapes du pipeline et reconstruction complète
//!
//! Rien ne s'exécute au chargement : chaque étape est appelée explicitement,
//! et [`rebuild`] les enchaîne (entraînement, sauvegarde, annotation,
//! échantillonnage, zones, évaluation, fichiers GeoJSON).

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use firerisk::model::dataset;
use firerisk::{
    evaluate, grid, sampler, score, zones, CountryBoundary, Evaluation, HotspotFeed,
    HotspotObservation, RiskModel, ScoredGrid,
};

use crate::config::{Config, API_KEY_ENV};
use crate::export;
use crate::report::RunReport;

pub const SCORED_GRID_FILE: &str = "scored_grid.geojson";
pub const SAMPLED_GRID_FILE: &str = "sampled_grid.geojson";
pub const ZONES_FILE: &str = "risk_zones.geojson";
pub const HOTSPOTS_FILE: &str = "hotspots.geojson";
pub const REPORT_FILE: &str = "report.json";

/// Charge la frontière du pays configuré
pub fn load_boundary(config: &Config) -> Result<CountryBoundary> {
    CountryBoundary::load(
        &config.paths.boundary,
        &config.region.attribute,
        &config.region.name,
    )
    .with_context(|| {
        format!(
            "Failed to load boundary '{}' from {}",
            config.region.name,
            config.paths.boundary.display()
        )
    })
}

/// Entraîne le modèle sur la table historique et sauvegarde les artefacts
pub fn train(config: &Config, report: &mut RunReport) -> Result<RiskModel> {
    let rows = dataset::load_csv(&config.paths.training_table).with_context(|| {
        format!(
            "Failed to load training table {}",
            config.paths.training_table.display()
        )
    })?;

    let (model, summary) =
        RiskModel::train_detailed(&rows, &config.training).context("Training failed")?;

    model
        .save(&config.paths.model_dir)
        .with_context(|| format!("Failed to save model to {}", config.paths.model_dir.display()))?;

    report.training = Some(summary);
    Ok(model)
}

/// Charge le modèle sauvegardé
pub fn load_model(config: &Config) -> Result<RiskModel> {
    RiskModel::load(&config.paths.model_dir).with_context(|| {
        format!(
            "Failed to load model from {} (run 'train' first)",
            config.paths.model_dir.display()
        )
    })
}

/// Génère et annote la grille du pays
pub fn score_grid(
    config: &Config,
    boundary: &CountryBoundary,
    model: &RiskModel,
) -> Result<ScoredGrid> {
    let candidates = grid::generate(&config.grid.bbox, config.grid.step_deg, boundary)
        .context("Grid generation failed")?;
    let scored = score(&candidates, model).context("Scoring failed")?;

    info!(
        points = scored.len(),
        step = config.grid.step_deg,
        "Grid scored"
    );

    Ok(scored)
}

/// Écrit la grille complète, la grille échantillonnée et les zones
pub fn write_map_outputs(
    config: &Config,
    scored: &ScoredGrid,
    report: &mut RunReport,
) -> Result<()> {
    let out = &config.paths.output_dir;
    report.record_scored(scored);

    let path = out.join(SCORED_GRID_FILE);
    export::write_scored_grid(scored, &path)?;
    report.record_output(&path);

    let sampled = sampler::sample(
        scored,
        config.sampling.ratio,
        &config.sampling.weights,
        config.sampling.seed,
    )
    .context("Sampling failed")?;
    report.sampled_points = sampled.len();

    let path = out.join(SAMPLED_GRID_FILE);
    export::write_scored_grid(&sampled, &path)?;
    report.record_output(&path);

    write_zones(config, scored, report)?;

    Ok(())
}

/// Construit et écrit les zones de risque
pub fn write_zones(config: &Config, scored: &ScoredGrid, report: &mut RunReport) -> Result<PathBuf> {
    let zones = zones::build_zones(
        scored,
        config.grid.step_deg,
        config.zones.simplify_meters,
        config.zones.fill_margin,
    )
    .context("Zone construction failed")?;

    for (class, zone) in &zones {
        report.record_zone(*class, zone.0.len());
    }

    let path = config.paths.output_dir.join(ZONES_FILE);
    export::write_zones(&zones, &path)?;
    report.record_output(&path);

    Ok(path)
}

/// Récupère les hotspots récents du pays
pub async fn fetch_hotspots(
    config: &Config,
    boundary: &CountryBoundary,
) -> firerisk::Result<Vec<HotspotObservation>> {
    let feed = HotspotFeed::new(config.feed.client.clone())?;
    feed.fetch(&config.grid.bbox, boundary, config.feed.lookback_days)
        .await
}

/// Évalue la grille contre le flux ; un flux indisponible n'est qu'un avertissement
pub async fn evaluate_live(
    config: &Config,
    boundary: &CountryBoundary,
    scored: &ScoredGrid,
    report: &mut RunReport,
) -> Result<Option<Evaluation>> {
    if !config.has_api_key() {
        report.record_warning(format!("{} is not set, live evaluation skipped", API_KEY_ENV));
        return Ok(None);
    }

    let hotspots = match fetch_hotspots(config, boundary).await {
        Ok(hotspots) => hotspots,
        Err(e) if e.is_feed_unavailable() => {
            warn!(error = %e, "Hotspot feed unavailable, evaluation skipped");
            report.record_warning(e.to_string());
            return Ok(None);
        }
        Err(e) => return Err(e).context("Hotspot fetch failed"),
    };

    let evaluation = evaluate(
        scored,
        &hotspots,
        config.evaluation.high_risk_threshold,
        config.evaluation.buffer_meters,
    )
    .context("Evaluation failed")?;

    let path = config.paths.output_dir.join(HOTSPOTS_FILE);
    export::write_hotspots(&hotspots, &path)?;
    report.record_output(&path);

    report.hotspots = Some(hotspots.len());
    report.evaluation = Some(evaluation);

    Ok(Some(evaluation))
}

/// Reconstruction complète : entraînement, cartes, évaluation, rapport
pub async fn rebuild(config: &Config) -> Result<RunReport> {
    let start = Instant::now();
    let mut report = RunReport::new(&config.region.name);

    info!(region = %config.region.name, "Rebuilding fire risk maps");

    let model = train(config, &mut report)?;
    let boundary = load_boundary(config)?;
    let scored = score_grid(config, &boundary, &model)?;

    write_map_outputs(config, &scored, &mut report)?;
    evaluate_live(config, &boundary, &scored, &mut report).await?;

    report.set_duration(start.elapsed());
    report.finalize();

    let path = config.paths.output_dir.join(REPORT_FILE);
    report.record_output(&path);
    report.save_to_file(&path)?;

    info!(
        status = ?report.status,
        duration_secs = report.duration_secs,
        summary = %report.summary(),
        "Rebuild complete"
    );

    Ok(report)
}

/// Vrai si les deux artefacts de modèle sont présents dans `dir`
pub fn model_exists(dir: &Path) -> bool {
    RiskModel::artifact_paths(dir).iter().all(|p| p.exists())
}
