//! Modèle de risque : deux classifieurs chaînés
//!
//! - étage A : (lat, lon) → classe de végétation
//! - étage B : (lat, lon, végétation) → classe de risque
//!
//! L'étage B est entraîné sur la végétation prédite hors-pli par l'étage A et
//! non sur la végétation observée, pour reproduire à l'entraînement la
//! distribution d'erreur qu'il verra à l'inférence.
//!
//! Le modèle est entraîné une fois, sauvegardé, puis rechargé en lecture seule.
//! Aucune opération de prédiction ne déclenche de réentraînement.

pub mod artifact;
pub mod dataset;
pub mod folds;
pub mod forest;

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FireRiskError, Result};
use crate::types::{FireRiskLabel, GeoPoint, RiskClass, VegetationClass};
use artifact::ArtifactKind;
use forest::{FeatureMatrix, ForestParams, RandomForest};

pub use folds::{kfold, Fold, OutOfFold};

/// Nom de fichier de l'artefact de végétation
pub const VEGETATION_ARTIFACT: &str = "vegetation_rf.bin";

/// Nom de fichier de l'artefact de risque
pub const FIRE_ARTIFACT: &str = "fire_rf.bin";

const VEGETATION_FEATURES: usize = 2;
const FIRE_FEATURES: usize = 3;

/// Ligne de la table historique
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRow {
    pub lat: f64,
    pub lon: f64,
    pub vegetation: VegetationClass,
    pub fire_risk: FireRiskLabel,
}

/// Paramètres d'entraînement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Nombre de plis pour la végétation hors-pli
    pub n_folds: usize,

    /// Graine du mélange des plis
    pub fold_seed: u64,

    /// Arbres par modèle de pli
    pub fold_trees: usize,

    /// Arbres du classifieur de végétation final
    pub vegetation_trees: usize,

    /// Arbres du classifieur de risque
    pub fire_trees: usize,

    /// Graine des forêts
    pub seed: u64,

    pub max_depth: Option<usize>,

    /// Fraction des lignes étiquetées à conserver (tirage seedé), `None` = toutes
    pub sample_fraction: Option<f64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_folds: 5,
            fold_seed: 42,
            fold_trees: 100,
            vegetation_trees: 200,
            fire_trees: 300,
            seed: 42,
            max_depth: None,
            sample_fraction: None,
        }
    }
}

impl TrainingParams {
    fn forest(&self, n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            seed: self.seed,
            max_depth: self.max_depth,
            max_features: None,
        }
    }
}

/// Statistiques d'un entraînement
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub rows_total: usize,
    pub rows_labeled: usize,
    pub rows_used: usize,
    pub folds: usize,

    /// Exactitude de la végétation hors-pli
    pub oof_vegetation_accuracy: f64,
}

/// Les deux classifieurs chaînés
#[derive(Debug, PartialEq)]
pub struct RiskModel {
    vegetation: RandomForest<VegetationClass>,
    fire_risk: RandomForest<RiskClass>,
}

impl RiskModel {
    /// Entraîne le modèle sur la table historique
    ///
    /// # Errors
    ///
    /// `InsufficientData` s'il reste moins de deux lignes étiquetées après
    /// exclusion des `Unknown`.
    pub fn train(rows: &[TrainingRow], params: &TrainingParams) -> Result<Self> {
        Self::train_detailed(rows, params).map(|(model, _)| model)
    }

    /// Comme [`Self::train`], avec les statistiques d'entraînement
    pub fn train_detailed(
        rows: &[TrainingRow],
        params: &TrainingParams,
    ) -> Result<(Self, TrainingSummary)> {
        let labeled: Vec<(TrainingRow, RiskClass)> = rows
            .iter()
            .filter_map(|row| row.fire_risk.known().map(|risk| (*row, risk)))
            .collect();
        let rows_labeled = labeled.len();

        if labeled.is_empty() {
            return Err(FireRiskError::InsufficientData(format!(
                "no labeled rows among {} (all fire risk labels are Unknown)",
                rows.len()
            )));
        }

        let labeled = subsample(labeled, params.sample_fraction, params.seed)?;
        let n = labeled.len();

        if n < 2 {
            return Err(FireRiskError::InsufficientData(format!(
                "{} labeled row(s), at least 2 are needed for out-of-fold training",
                n
            )));
        }

        let k = params.n_folds.min(n);

        // Étage A : végétation
        let mut x_veg = FeatureMatrix::with_capacity(VEGETATION_FEATURES, n);
        let mut y_veg = Vec::with_capacity(n);
        for (row, _) in &labeled {
            x_veg.push_row(&[row.lat, row.lon]);
            y_veg.push(row.vegetation);
        }

        let oof = folds::out_of_fold_predictions(
            &x_veg,
            &y_veg,
            k,
            params.fold_seed,
            &params.forest(params.fold_trees),
        )?;
        let oof_accuracy = oof.accuracy(&y_veg);

        debug!(
            folds = k,
            accuracy = oof_accuracy,
            "Out-of-fold vegetation computed"
        );

        let vegetation = RandomForest::fit(&x_veg, &y_veg, &params.forest(params.vegetation_trees))?;

        // Étage B : risque sur la végétation hors-pli
        let mut x_fire = FeatureMatrix::with_capacity(FIRE_FEATURES, n);
        let mut y_fire = Vec::with_capacity(n);
        for ((row, risk), veg) in labeled.iter().zip(&oof.predictions) {
            x_fire.push_row(&fire_features(row.lat, row.lon, *veg));
            y_fire.push(*risk);
        }

        let fire_risk = RandomForest::fit(&x_fire, &y_fire, &params.forest(params.fire_trees))?;

        let summary = TrainingSummary {
            rows_total: rows.len(),
            rows_labeled,
            rows_used: n,
            folds: k,
            oof_vegetation_accuracy: oof_accuracy,
        };

        info!(
            rows = summary.rows_total,
            labeled = summary.rows_labeled,
            used = summary.rows_used,
            folds = summary.folds,
            oof_accuracy = summary.oof_vegetation_accuracy,
            "Risk model trained"
        );

        Ok((
            Self {
                vegetation,
                fire_risk,
            },
            summary,
        ))
    }

    /// Prédit (végétation, risque) pour chaque point, dans l'ordre
    pub fn predict(&self, points: &[GeoPoint]) -> Result<Vec<(VegetationClass, RiskClass)>> {
        let mut x_veg = FeatureMatrix::with_capacity(VEGETATION_FEATURES, points.len());
        for p in points {
            x_veg.push_row(&[p.lat, p.lon]);
        }
        let vegetation = self.vegetation.predict(&x_veg)?;

        let mut x_fire = FeatureMatrix::with_capacity(FIRE_FEATURES, points.len());
        for (p, veg) in points.iter().zip(&vegetation) {
            x_fire.push_row(&fire_features(p.lat, p.lon, *veg));
        }
        let risk = self.fire_risk.predict(&x_fire)?;

        Ok(vegetation.into_iter().zip(risk).collect())
    }

    pub fn vegetation(&self) -> &RandomForest<VegetationClass> {
        &self.vegetation
    }

    pub fn fire_risk(&self) -> &RandomForest<RiskClass> {
        &self.fire_risk
    }

    /// Sauvegarde les deux artefacts dans `dir`
    ///
    /// Les deux fichiers sont préparés puis publiés ensemble et portent le même
    /// identifiant de modèle : [`RiskModel::load`] refuse une paire issue de
    /// deux entraînements. Deux sauvegardes concurrentes dans le même
    /// répertoire doivent être sérialisées par l'appelant.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let model_id = self.model_id()?;

        let vegetation_path = dir.join(VEGETATION_ARTIFACT);
        let vegetation_tmp = artifact::stage(
            &vegetation_path,
            ArtifactKind::Vegetation,
            &StoredRef {
                model_id: &model_id,
                forest: &self.vegetation,
            },
        )?;

        let fire_path = dir.join(FIRE_ARTIFACT);
        let fire_tmp = match artifact::stage(
            &fire_path,
            ArtifactKind::FireRisk,
            &StoredRef {
                model_id: &model_id,
                forest: &self.fire_risk,
            },
        ) {
            Ok(tmp) => tmp,
            Err(e) => {
                artifact::discard(&vegetation_tmp);
                return Err(e);
            }
        };

        if let Err(e) = artifact::commit(&vegetation_tmp, &vegetation_path) {
            artifact::discard(&fire_tmp);
            return Err(e);
        }
        artifact::commit(&fire_tmp, &fire_path)?;

        info!(dir = %dir.display(), model_id = %model_id, "Risk model saved");
        Ok(())
    }

    /// Recharge les deux artefacts depuis `dir`
    ///
    /// # Errors
    ///
    /// `ModelArtifact` si un fichier manque, est corrompu ou incohérent, ou si
    /// les deux fichiers ne viennent pas du même entraînement.
    pub fn load(dir: &Path) -> Result<Self> {
        let vegetation_path = dir.join(VEGETATION_ARTIFACT);
        let fire_path = dir.join(FIRE_ARTIFACT);

        let (vegetation_id, vegetation) = read_vegetation(&vegetation_path)?;
        let (fire_id, fire_risk) = read_fire_risk(&fire_path)?;

        if vegetation_id != fire_id {
            return Err(FireRiskError::artifact(
                &fire_path,
                format!(
                    "artifacts come from different trainings ({} vs {})",
                    vegetation_id, fire_id
                ),
            ));
        }

        let model = Self {
            vegetation,
            fire_risk,
        };

        info!(
            dir = %dir.display(),
            model_id = %fire_id,
            vegetation_trees = model.vegetation.n_trees(),
            fire_trees = model.fire_risk.n_trees(),
            "Risk model loaded"
        );

        Ok(model)
    }

    /// Empreinte blake3 des deux forêts sérialisées
    fn model_id(&self) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        for bytes in [
            serde_json::to_vec(&self.vegetation),
            serde_json::to_vec(&self.fire_risk),
        ] {
            let bytes = bytes.map_err(|e| {
                FireRiskError::InvalidParameter(format!("cannot serialize model: {}", e))
            })?;
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(&bytes);
        }
        Ok(hasher.finalize().to_hex()[..16].to_string())
    }

    /// Chemins des deux artefacts dans `dir`
    pub fn artifact_paths(dir: &Path) -> [PathBuf; 2] {
        [dir.join(VEGETATION_ARTIFACT), dir.join(FIRE_ARTIFACT)]
    }
}

/// Contenu d'un artefact : la forêt et l'identifiant de l'entraînement
#[derive(Serialize)]
struct StoredRef<'a, F> {
    model_id: &'a str,
    forest: &'a F,
}

#[derive(Deserialize)]
struct Stored<F> {
    model_id: String,
    forest: F,
}

fn read_vegetation(path: &Path) -> Result<(String, RandomForest<VegetationClass>)> {
    let stored: Stored<RandomForest<VegetationClass>> =
        artifact::read(path, ArtifactKind::Vegetation)?;
    stored
        .forest
        .validate(VEGETATION_FEATURES)
        .map_err(|reason| FireRiskError::artifact(path, reason))?;
    Ok((stored.model_id, stored.forest))
}

fn read_fire_risk(path: &Path) -> Result<(String, RandomForest<RiskClass>)> {
    let stored: Stored<RandomForest<RiskClass>> = artifact::read(path, ArtifactKind::FireRisk)?;
    stored
        .forest
        .validate(FIRE_FEATURES)
        .map_err(|reason| FireRiskError::artifact(path, reason))?;
    Ok((stored.model_id, stored.forest))
}

/// Charge seul le classifieur de végétation
pub fn load_vegetation(path: &Path) -> Result<RandomForest<VegetationClass>> {
    read_vegetation(path).map(|(_, forest)| forest)
}

/// Charge seul le classifieur de risque
pub fn load_fire_risk(path: &Path) -> Result<RandomForest<RiskClass>> {
    read_fire_risk(path).map(|(_, forest)| forest)
}

fn fire_features(lat: f64, lon: f64, vegetation: VegetationClass) -> [f64; FIRE_FEATURES] {
    [lat, lon, f64::from(vegetation.code())]
}

/// Tirage seedé d'une fraction des lignes, ordre d'origine conservé
fn subsample<T>(rows: Vec<T>, fraction: Option<f64>, seed: u64) -> Result<Vec<T>> {
    let Some(fraction) = fraction else {
        return Ok(rows);
    };
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(FireRiskError::InvalidParameter(format!(
            "sample fraction must be in (0, 1], got {}",
            fraction
        )));
    }

    let n = rows.len();
    let keep = ((fraction * n as f64).round() as usize).clamp(1, n);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let mut selected = vec![false; n];
    indices[..keep].iter().for_each(|&i| selected[i] = true);

    Ok(rows
        .into_iter()
        .zip(selected)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect())
}
